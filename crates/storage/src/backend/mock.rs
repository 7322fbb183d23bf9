//! In-memory blob store for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{Listing, ObjectRef};
use crate::path::validate as validate_path;
use crate::BlobStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory blob store for testing.
///
/// Objects live in a map behind a [`RwLock`]; folder prefixes are derived
/// from object paths. On top of that the mock can misbehave in the ways a
/// real store might:
///
/// - [`with_alias`](Self::with_alias) makes a listing return an extra prefix
///   that points elsewhere in the tree (duplicates and cycles);
/// - [`fail_listing`](Self::fail_listing) makes listing a prefix fail with a
///   network error;
/// - [`with_yields`](Self::with_yields) delays a listing by yielding to the
///   executor, so concurrent listings complete in a chosen order.
///
/// Every listed prefix is recorded so tests can assert on traversal.
///
/// # Examples
///
/// ```
/// use folio_storage::{BlobStore, backend::MockStore};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::with_files(["GT-100/parts.pdf", "GT-100/old/parts-v1.pdf"]);
/// let listing = store.list_children(Some(Path::new("GT-100"))).await?;
/// assert_eq!(listing.items.len(), 1);
/// assert_eq!(listing.prefixes.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockStore {
    name: String,
    objects: RwLock<BTreeSet<PathBuf>>,
    aliases: RwLock<HashMap<Option<PathBuf>, Vec<PathBuf>>>,
    failing: RwLock<HashSet<Option<PathBuf>>>,
    yields: RwLock<HashMap<Option<PathBuf>, usize>>,
    listed: RwLock<Vec<Option<PathBuf>>>,
    urls_resolved: AtomicUsize,
}

impl MockStore {
    /// Create a mock store pre-populated with objects.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let mut objects = BTreeSet::new();
        for path in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockStore::with_files: invalid path {}", path.display());
            };
            objects.insert(validated);
        }
        Self {
            name: "mock".to_string(),
            objects: RwLock::new(objects),
            aliases: RwLock::default(),
            failing: RwLock::default(),
            yields: RwLock::default(),
            listed: RwLock::default(),
            urls_resolved: AtomicUsize::new(0),
        }
    }

    /// Listing `under` (`None` for the root) additionally returns `target` as
    /// a child prefix.
    pub fn with_alias(mut self, under: Option<&str>, target: &str) -> Self {
        self.aliases.get_mut().entry(under.map(PathBuf::from)).or_default().push(PathBuf::from(target));
        self
    }

    /// Listing `prefix` yields to the executor `count` times before
    /// completing.
    pub fn with_yields(mut self, prefix: Option<&str>, count: usize) -> Self {
        self.yields.get_mut().insert(prefix.map(PathBuf::from), count);
        self
    }

    /// Listing `prefix` fails with [`ErrorKind::Network`].
    pub async fn fail_listing(&self, prefix: Option<&str>) {
        self.failing.write().await.insert(prefix.map(PathBuf::from));
    }

    /// Add an object after construction.
    pub async fn insert(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = validate_path(path.into())?;
        self.objects.write().await.insert(path);
        Ok(())
    }

    /// Every prefix listed so far, in call order (`None` for the root).
    pub async fn listed(&self) -> Vec<Option<PathBuf>> {
        self.listed.read().await.clone()
    }

    /// Number of download URLs resolved so far.
    pub fn urls_resolved(&self) -> usize {
        self.urls_resolved.load(Ordering::SeqCst)
    }
}
impl Default for MockStore {
    fn default() -> Self {
        let files: [&str; 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl BlobStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_children(&self, prefix: Option<&Path>) -> Result<Listing> {
        let prefix = prefix.map(validate_path).transpose()?;
        self.listed.write().await.push(prefix.clone());
        let yields = self.yields.read().await.get(&prefix).copied().unwrap_or(0);
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        if self.failing.read().await.contains(&prefix) {
            let shown = prefix.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<root>".to_string());
            exn::bail!(ErrorKind::Network(format!("listing {shown} failed")));
        }

        // Snapshot under the read lock, then drop it before building results.
        let objects: Vec<PathBuf> = self.objects.read().await.iter().cloned().collect();
        let mut items = Vec::new();
        let mut prefixes = BTreeMap::new();
        for object in objects {
            let relative = match &prefix {
                Some(pfx) => match object.strip_prefix(pfx) {
                    Ok(rest) => rest.to_path_buf(),
                    Err(_) => continue,
                },
                None => object.clone(),
            };
            let mut components = relative.components();
            let Some(first) = components.next() else {
                continue;
            };
            if components.next().is_none() {
                items.push(ObjectRef::new(object));
            } else {
                let child = match &prefix {
                    Some(pfx) => pfx.join(first),
                    None => PathBuf::from(first.as_os_str()),
                };
                prefixes.insert(child.clone(), ObjectRef::new(child));
            }
        }
        let mut prefixes: Vec<ObjectRef> = prefixes.into_values().collect();
        if let Some(extra) = self.aliases.read().await.get(&prefix) {
            prefixes.extend(extra.iter().map(|target| ObjectRef::new(target.clone())));
        }
        Ok(Listing { items, prefixes })
    }

    async fn download_url(&self, item: &ObjectRef) -> Result<String> {
        let path = validate_path(&item.full_path)?;
        if !self.objects.read().await.contains(&path) {
            exn::bail!(ErrorKind::NotFound(path));
        }
        self.urls_resolved.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mock://{}/{}", self.name, path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_root() {
        let store = MockStore::with_files(["A/one.pdf", "B/two.pdf", "root.pdf"]);
        let listing = store.list_children(None).await.unwrap();
        assert_eq!(listing.items, vec![ObjectRef::new("root.pdf")]);
        assert_eq!(listing.prefixes, vec![ObjectRef::new("A"), ObjectRef::new("B")]);
    }

    #[tokio::test]
    async fn test_alias_adds_prefix() {
        let store = MockStore::with_files(["A/sub/one.pdf"]).with_alias(Some("A/sub"), "A");
        let listing = store.list_children(Some(Path::new("A/sub"))).await.unwrap();
        assert_eq!(listing.prefixes, vec![ObjectRef::new("A")]);
    }

    #[tokio::test]
    async fn test_fail_listing() {
        let store = MockStore::with_files(["A/one.pdf"]);
        store.fail_listing(Some("A")).await;
        let err = store.list_children(Some(Path::new("A"))).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert!(store.list_children(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_listed_records_calls() {
        let store = MockStore::with_files(["A/one.pdf"]);
        store.list_children(None).await.unwrap();
        store.list_children(Some(Path::new("A/"))).await.unwrap();
        assert_eq!(store.listed().await, vec![None, Some(PathBuf::from("A"))]);
    }

    #[tokio::test]
    async fn test_download_url() {
        let store = MockStore::with_files(["A/one.pdf"]);
        let url = store.download_url(&ObjectRef::new("A/one.pdf")).await.unwrap();
        assert_eq!(url, "mock://mock/A/one.pdf");
        assert_eq!(store.urls_resolved(), 1);
        let err = store.download_url(&ObjectRef::new("A/two.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockStore::with_files(["../escape.pdf"]);
    }
}
