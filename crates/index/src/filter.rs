//! Free-text filter applied when displaying an index.
//!
//! Unrelated to the model filter, which decides what gets indexed at all.

use crate::models::{DocumentEntry, Index};

/// A folder that survived [`filter_folders`], with the files to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMatch<'a> {
    pub folder: &'a str,
    pub files: Vec<&'a DocumentEntry>,
}

/// Filter folders and their files by `query`, case-insensitively.
///
/// An empty query keeps everything. A folder whose name matches keeps all of
/// its files; otherwise only files whose name or path matches are kept and
/// folders left without files are dropped.
pub fn filter_folders<'a>(
    folders: impl IntoIterator<Item = (&'a str, &'a [DocumentEntry])>,
    query: &str,
) -> Vec<FolderMatch<'a>> {
    let query = query.trim().to_lowercase();
    folders
        .into_iter()
        .filter_map(|(folder, files)| {
            if query.is_empty() || folder.to_lowercase().contains(&query) {
                return Some(FolderMatch { folder, files: files.iter().collect() });
            }
            let files: Vec<_> = files
                .iter()
                .filter(|file| {
                    file.name.to_lowercase().contains(&query)
                        || file.full_path.to_string_lossy().to_lowercase().contains(&query)
                })
                .collect();
            (!files.is_empty()).then_some(FolderMatch { folder, files })
        })
        .collect()
}

impl Index {
    /// [`filter_folders`] over every indexed folder.
    pub fn filter(&self, query: &str) -> Vec<FolderMatch<'_>> {
        filter_folders(self.folders.iter().map(|(name, sourced)| (name.as_str(), sourced.value.as_slice())), query)
    }
}
