//! Index models.

use crate::classify::{Category, classify};
use derive_more::Display;
use folio_storage::ObjectRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Folder name that files sitting directly under the root prefix are grouped
/// under. A listed prefix name never contains a separator, so this can't
/// clash with a real folder.
pub const ROOT_FOLDER: &str = "/";

/// A folder-like prefix discovered during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryNode {
    pub name: String,
    pub full_path: PathBuf,
    pub parent: Option<PathBuf>,
}
impl From<&ObjectRef> for RepositoryNode {
    fn from(object: &ObjectRef) -> Self {
        Self {
            name: object.name.clone(),
            full_path: object.full_path.clone(),
            parent: object.parent().map(PathBuf::from),
        }
    }
}

/// A leaf document with a resolved download URL.
///
/// Cached listings written before categories were stored still deserialize;
/// the category is derived from the name when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredEntry")]
pub struct DocumentEntry {
    pub name: String,
    #[serde(rename = "path")]
    pub full_path: PathBuf,
    pub url: String,
    pub category: Category,
}
impl DocumentEntry {
    pub fn new(object: &ObjectRef, url: String) -> Self {
        Self {
            name: object.name.clone(),
            full_path: object.full_path.clone(),
            url,
            category: classify(&object.name),
        }
    }

    /// See [`Category::display_name`].
    pub fn display_name(&self, model: Option<&str>) -> String {
        self.category.display_name(&self.name, model)
    }

    /// Case-insensitive match against the file name only.
    pub(crate) fn matches_model(&self, model: &str) -> bool {
        self.name.to_lowercase().contains(&model.to_lowercase())
    }
}

#[derive(Deserialize)]
struct StoredEntry {
    name: String,
    path: PathBuf,
    url: String,
    category: Option<Category>,
}
impl From<StoredEntry> for DocumentEntry {
    fn from(stored: StoredEntry) -> Self {
        let category = stored.category.unwrap_or_else(|| classify(&stored.name));
        Self { name: stored.name, full_path: stored.path, url: stored.url, category }
    }
}

/// Where a value came from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    #[display("live")]
    Live,
    #[display("cache")]
    Cache,
    #[display("fallback")]
    Fallback,
}

/// A value tagged with its [`Source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced<T> {
    pub value: T,
    pub source: Source,
}
impl<T> Sourced<T> {
    pub fn live(value: T) -> Self {
        Self { value, source: Source::Live }
    }

    pub fn cached(value: T) -> Self {
        Self { value, source: Source::Cache }
    }

    pub fn fallback(value: T) -> Self {
        Self { value, source: Source::Fallback }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced { value: f(self.value), source: self.source }
    }
}

/// Folder name to documents, as produced by a full indexing pass.
///
/// Folders are ordered by name and entries by path, so two passes over the
/// same store snapshot compare equal however their listings interleaved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub folders: BTreeMap<String, Sourced<Vec<DocumentEntry>>>,
    /// Folders known from the cached folder list but with no cached listing.
    pub uncached: BTreeSet<String>,
}
impl Index {
    pub fn entries(&self, folder: &str) -> Option<&[DocumentEntry]> {
        self.folders.get(folder).map(|sourced| sourced.value.as_slice())
    }

    pub fn document_count(&self) -> usize {
        self.folders.values().map(|sourced| sourced.value.len()).sum()
    }
}

/// Documents grouped by category. Every category is present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedDocuments {
    pub groups: BTreeMap<Category, Vec<DocumentEntry>>,
    pub source: Source,
}
impl GroupedDocuments {
    pub fn new(entries: impl IntoIterator<Item = DocumentEntry>, source: Source) -> Self {
        let mut groups: BTreeMap<Category, Vec<DocumentEntry>> =
            Category::ALL.iter().map(|&category| (category, Vec::new())).collect();
        for entry in entries {
            groups.entry(entry.category).or_default().push(entry);
        }
        Self { groups, source }
    }

    pub fn get(&self, category: Category) -> &[DocumentEntry] {
        self.groups.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }
}

/// Sort by path and drop duplicate paths.
pub(crate) fn normalize(entries: &mut Vec<DocumentEntry>) {
    entries.sort_by(|a, b| a.full_path.cmp(&b.full_path));
    entries.dedup_by(|a, b| a.full_path == b.full_path);
}
