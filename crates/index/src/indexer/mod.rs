//! Repository traversal.
//!
//! Folders are walked breadth first, one level at a time: the whole frontier
//! of a level is listed concurrently before the next level starts, and the
//! walk stops `max_depth` levels below each top-level folder. Every prefix is
//! listed at most once per pass, so aliased or cyclic prefixes are harmless.

mod stream;

pub use self::stream::{IndexEvent, MAX_FOLDER_CONCURRENCY};

use crate::connectivity::Connectivity;
use crate::error::{ErrorKind, Result};
use crate::fallback::FallbackPolicy;
use crate::models::{DocumentEntry, GroupedDocuments, Index, ROOT_FOLDER, RepositoryNode, Sourced, normalize};
use exn::ResultExt;
use folio_cache::{CacheHandle, CacheKey, KeyValueCache};
use folio_storage::{BlobStore, ObjectRef, StoreHandle};
use futures::future::try_join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const DEFAULT_MAX_DEPTH: usize = 1;
pub const DEFAULT_MANUALS_PREFIX: &str = "UserManuals";

/// Where to start and how deep to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Prefix that top-level folders live under (`None` for the store root).
    pub root_prefix: Option<PathBuf>,
    /// Levels to descend below each top-level folder; `0` lists only the
    /// folder itself.
    pub max_depth: usize,
    /// Folder holding the per-model user manuals, relative to `root_prefix`.
    pub manuals_prefix: PathBuf,
}
impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            root_prefix: None,
            max_depth: DEFAULT_MAX_DEPTH,
            manuals_prefix: PathBuf::from(DEFAULT_MANUALS_PREFIX),
        }
    }
}

/// A prefix waiting to be listed, and the top-level folder it belongs to.
struct Visit {
    group: String,
    node: RepositoryNode,
    depth: usize,
}

/// Builds folder listings from a [`BlobStore`](folio_storage::BlobStore),
/// caching every live result and serving cached results while offline.
pub struct RepositoryIndexer {
    store: StoreHandle,
    cache: CacheHandle,
    connectivity: Connectivity,
    options: IndexOptions,
    fallback: FallbackPolicy,
}

impl RepositoryIndexer {
    pub fn new(store: StoreHandle, cache: CacheHandle, connectivity: Connectivity) -> Self {
        Self {
            store,
            cache,
            connectivity,
            options: IndexOptions::default(),
            fallback: FallbackPolicy::disabled(),
        }
    }

    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    fn under_root(&self, path: impl AsRef<Path>) -> PathBuf {
        match &self.options.root_prefix {
            Some(root) => root.join(path),
            None => path.as_ref().to_path_buf(),
        }
    }

    /// Names of the folders directly under the root prefix, sorted.
    ///
    /// # Errors
    /// - [`ErrorKind::Transport`] if the store can't be listed.
    /// - [`ErrorKind::CacheMiss`] when offline and nothing was cached.
    #[instrument(skip(self))]
    pub async fn top_level_folders(&self) -> Result<Sourced<Vec<String>>> {
        let key = CacheKey::folders();
        if !self.connectivity.is_online() {
            return self.read_cached(&key).await.map(Sourced::cached);
        }
        let listing = self
            .store
            .list_children(self.options.root_prefix.as_deref())
            .await
            .or_raise(|| ErrorKind::Transport)?;
        let mut folders: Vec<String> = listing.prefixes.into_iter().map(|prefix| prefix.name).collect();
        folders.sort();
        folders.dedup();
        tracing::debug!(count = folders.len(), "Listed top-level folders");
        self.write_cached(&key, &folders).await;
        Ok(Sourced::live(folders))
    }

    /// Every document under one top-level folder, down to `max_depth`.
    ///
    /// The unfiltered listing is cached; `model_filter` is applied afterwards
    /// and only ever looks at file names. [`ROOT_FOLDER`] addresses the files
    /// sitting directly under the root prefix.
    #[instrument(skip(self))]
    pub async fn folder(&self, name: &str, model_filter: Option<&str>) -> Result<Sourced<Vec<DocumentEntry>>> {
        let key = CacheKey::folder(name);
        let entries = if self.connectivity.is_online() {
            let entries = if name == ROOT_FOLDER {
                self.root_entries().await?
            } else {
                let start = self.under_root(name);
                self.traverse(vec![(name.to_string(), start)], self.options.max_depth)
                    .await?
                    .remove(name)
                    .unwrap_or_default()
            };
            self.write_cached(&key, &entries).await;
            Sourced::live(entries)
        } else {
            Sourced::cached(self.read_cached(&key).await?)
        };
        Ok(self.finish(name, entries, model_filter))
    }

    /// Index every top-level folder under the configured root prefix, plus
    /// [`ROOT_FOLDER`] for files directly under it.
    ///
    /// The whole pass shares one visited set. Offline, the index is rebuilt
    /// from the cache; folders without a cached listing end up in
    /// [`Index::uncached`].
    #[instrument(skip(self))]
    pub async fn index(&self, model_filter: Option<&str>) -> Result<Index> {
        if !self.connectivity.is_online() {
            return self.index_cached(model_filter).await;
        }
        let root = self
            .store
            .list_children(self.options.root_prefix.as_deref())
            .await
            .or_raise(|| ErrorKind::Transport)?;
        let mut folders: Vec<String> = root.prefixes.iter().map(|prefix| prefix.name.clone()).collect();
        folders.sort();
        folders.dedup();
        self.write_cached(&CacheKey::folders(), &folders).await;

        let starts = root.prefixes.into_iter().map(|prefix| (prefix.name, prefix.full_path)).collect();
        let (mut root_entries, mut grouped) =
            futures::try_join!(self.resolve(&root.items), self.traverse(starts, self.options.max_depth))?;
        normalize(&mut root_entries);
        if root_entries.is_empty() {
            self.write_cached(&CacheKey::folder(ROOT_FOLDER), &root_entries).await;
        } else {
            grouped.insert(ROOT_FOLDER.to_string(), root_entries);
        }

        let mut index = Index::default();
        for (folder, entries) in grouped {
            self.write_cached(&CacheKey::folder(&folder), &entries).await;
            let sourced = self.finish(&folder, Sourced::live(entries), model_filter);
            index.folders.insert(folder, sourced);
        }
        tracing::info!(folders = index.folders.len(), documents = index.document_count(), "Index complete");
        Ok(index)
    }

    async fn index_cached(&self, model_filter: Option<&str>) -> Result<Index> {
        let mut folders: Vec<String> = self.read_cached(&CacheKey::folders()).await?;
        folders.push(ROOT_FOLDER.to_string());
        let cached = try_join_all(folders.iter().map(|folder| async move {
            match self.read_cached::<Vec<DocumentEntry>>(&CacheKey::folder(folder)).await {
                Ok(entries) => Ok(Some(entries)),
                Err(e) if matches!(&*e, ErrorKind::CacheMiss(_)) => Ok(None),
                Err(e) => Err(e),
            }
        }))
        .await?;

        let mut index = Index::default();
        for (folder, entries) in folders.into_iter().zip(cached) {
            match entries {
                // The root folder only exists when the root had files.
                None if folder == ROOT_FOLDER => {},
                Some(entries) if folder == ROOT_FOLDER && entries.is_empty() => {},
                Some(entries) => {
                    let sourced = self.finish(&folder, Sourced::cached(entries), model_filter);
                    index.folders.insert(folder, sourced);
                },
                None => {
                    tracing::debug!(%folder, "No cached listing");
                    index.uncached.insert(folder);
                },
            }
        }
        Ok(index)
    }

    /// User manuals for `model`, grouped by category.
    ///
    /// Only the manuals folder itself is listed. `prefix` defaults to the
    /// configured manuals prefix.
    #[instrument(skip(self))]
    pub async fn user_manuals(&self, prefix: Option<&Path>, model: Option<&str>) -> Result<GroupedDocuments> {
        let prefix = prefix.map_or_else(|| self.under_root(&self.options.manuals_prefix), Path::to_path_buf);
        let label = prefix.to_string_lossy().into_owned();
        let key = CacheKey::folder(&label);
        let sourced = if self.connectivity.is_online() {
            let entries = self.traverse(vec![(label.clone(), prefix.clone())], 0).await?.remove(&label).unwrap_or_default();
            self.write_cached(&key, &entries).await;
            Sourced::live(entries)
        } else {
            Sourced::cached(self.read_cached(&key).await?)
        };
        let mut sourced = filter_model(sourced, model);
        if sourced.value.is_empty()
            && let Some(samples) = self.fallback.manuals(&prefix, model)
        {
            tracing::warn!(key = %key, model, "No manuals found, substituting fallback set");
            sourced = Sourced::fallback(samples);
        }
        Ok(GroupedDocuments::new(sourced.value, sourced.source))
    }

    /// Apply the model filter, then the fallback policy.
    fn finish(&self, folder: &str, entries: Sourced<Vec<DocumentEntry>>, model_filter: Option<&str>) -> Sourced<Vec<DocumentEntry>> {
        let entries = filter_model(entries, model_filter);
        if !entries.value.is_empty() {
            return entries;
        }
        match self.fallback.record(folder) {
            Some(record) => {
                tracing::warn!(%folder, documents = record.len(), "Folder is empty, substituting fallback record");
                Sourced::fallback(record)
            },
            None => entries,
        }
    }

    /// Breadth-first walk from `starts`, grouping documents by start name.
    async fn traverse(&self, starts: Vec<(String, PathBuf)>, max_depth: usize) -> Result<BTreeMap<String, Vec<DocumentEntry>>> {
        let mut visited = HashSet::new();
        let mut grouped: BTreeMap<String, Vec<DocumentEntry>> = BTreeMap::new();
        let mut frontier = Vec::new();
        for (group, path) in starts {
            grouped.entry(group.clone()).or_default();
            if visited.insert(path.clone()) {
                let node = RepositoryNode::from(&ObjectRef::new(path));
                frontier.push(Visit { group, node, depth: 0 });
            }
        }

        while !frontier.is_empty() {
            tracing::trace!(width = frontier.len(), "Listing frontier");
            // Results come back in frontier order, whatever order the
            // listings complete in, so the merge below is deterministic.
            let listed = try_join_all(frontier.iter().map(|visit| self.visit(&visit.node))).await?;
            let mut next = Vec::new();
            for (visit, (entries, prefixes)) in frontier.into_iter().zip(listed) {
                grouped.entry(visit.group.clone()).or_default().extend(entries);
                if visit.depth >= max_depth {
                    continue;
                }
                for prefix in prefixes {
                    if !visited.insert(prefix.full_path.clone()) {
                        tracing::debug!(path = %prefix.full_path.display(), "Skipping already visited prefix");
                        continue;
                    }
                    next.push(Visit {
                        group: visit.group.clone(),
                        node: RepositoryNode::from(&prefix),
                        depth: visit.depth + 1,
                    });
                }
            }
            frontier = next;
        }

        for entries in grouped.values_mut() {
            normalize(entries);
        }
        Ok(grouped)
    }

    /// List one prefix and resolve its documents.
    async fn visit(&self, node: &RepositoryNode) -> Result<(Vec<DocumentEntry>, Vec<ObjectRef>)> {
        let listing = self.store.list_children(Some(&node.full_path)).await.or_raise(|| ErrorKind::Transport)?;
        let entries = self.resolve(&listing.items).await?;
        Ok((entries, listing.prefixes))
    }

    async fn root_entries(&self) -> Result<Vec<DocumentEntry>> {
        let listing = self
            .store
            .list_children(self.options.root_prefix.as_deref())
            .await
            .or_raise(|| ErrorKind::Transport)?;
        let mut entries = self.resolve(&listing.items).await?;
        normalize(&mut entries);
        Ok(entries)
    }

    /// Resolve download URLs for every item concurrently.
    async fn resolve(&self, items: &[ObjectRef]) -> Result<Vec<DocumentEntry>> {
        try_join_all(items.iter().map(|item| async move {
            let url = self.store.download_url(item).await.or_raise(|| ErrorKind::Transport)?;
            Ok(DocumentEntry::new(item, url))
        }))
        .await
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<T> {
        let Some(value) = self.cache.get(key.as_str()).await.or_raise(|| ErrorKind::Cache)? else {
            exn::bail!(ErrorKind::CacheMiss(key.to_string()));
        };
        tracing::debug!(%key, "Serving cached listing");
        serde_json::from_str(&value).or_raise(|| ErrorKind::Serialization)
    }

    /// Cache a live result. A failed write is logged; the live result stands.
    async fn write_cached<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(%key, %error, "Could not serialize listing for the cache");
                return;
            },
        };
        if let Err(error) = self.cache.set(key.as_str(), &json).await {
            tracing::warn!(%key, error = %error, "Could not write listing to the cache");
        }
    }
}

fn filter_model(entries: Sourced<Vec<DocumentEntry>>, model: Option<&str>) -> Sourced<Vec<DocumentEntry>> {
    match model.map(str::trim).filter(|m| !m.is_empty()) {
        Some(model) => entries.map(|entries| entries.into_iter().filter(|entry| entry.matches_model(model)).collect()),
        None => entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::models::Source;
    use folio_cache::{Database, MemoryCache};
    use folio_storage::backend::MockStore;
    use futures::StreamExt;
    use std::sync::Arc;

    const FILES: [&str; 7] = [
        "readme.pdf",
        "BROTHER HSM/3034D.PDF",
        "BROTHER HSM/manuals/B-737_instruction.pdf",
        "BROTHER HSM/manuals/old/B-737_v1.pdf",
        "GT-100/GT-100_parts.pdf",
        "GT-100/overview.pdf",
        "GT-100/errors/gt-100 error codes.pdf",
    ];

    fn indexer(store: Arc<MockStore>, online: bool) -> (RepositoryIndexer, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::default());
        (RepositoryIndexer::new(store, cache.clone(), Connectivity::new(online)), cache)
    }

    fn paths(entries: &[DocumentEntry]) -> Vec<&str> {
        entries.iter().filter_map(|e| e.full_path.to_str()).collect()
    }

    #[tokio::test]
    async fn test_index_groups_by_top_level_folder() {
        let (indexer, _cache) = indexer(Arc::new(MockStore::with_files(FILES)), true);
        let index = indexer.index(None).await.unwrap();
        assert_eq!(index.folders.keys().collect::<Vec<_>>(), vec![ROOT_FOLDER, "BROTHER HSM", "GT-100"]);
        assert_eq!(paths(index.entries("BROTHER HSM").unwrap()), vec![
            "BROTHER HSM/3034D.PDF",
            "BROTHER HSM/manuals/B-737_instruction.pdf",
        ]);
        assert_eq!(paths(index.entries(ROOT_FOLDER).unwrap()), vec!["readme.pdf"]);
        assert_eq!(index.entries("GT-100").unwrap()[0].url, "mock://mock/GT-100/GT-100_parts.pdf");
        assert!(index.folders.values().all(|s| s.source == Source::Live));
    }

    #[tokio::test]
    async fn test_index_is_independent_of_completion_order() {
        let skewed_store = MockStore::with_files(FILES)
            .with_yields(Some("BROTHER HSM"), 6)
            .with_yields(Some("GT-100/errors"), 4)
            .with_yields(Some("BROTHER HSM/manuals"), 1)
            .with_alias(Some("GT-100"), "BROTHER HSM/manuals");
        let plain_store = MockStore::with_files(FILES).with_alias(Some("GT-100"), "BROTHER HSM/manuals");
        let (skewed, _) = indexer(Arc::new(skewed_store), true);
        let (aliased, _) = indexer(Arc::new(plain_store), true);

        let expected = aliased.index(None).await.unwrap();
        assert_eq!(skewed.index(None).await.unwrap(), expected);
        for depth in 0..3 {
            let options = IndexOptions { max_depth: depth, ..IndexOptions::default() };
            let (a, _) = indexer(Arc::new(MockStore::with_files(FILES)), true);
            let (b, _) = indexer(Arc::new(MockStore::with_files(FILES).with_yields(Some("GT-100"), 5)), true);
            let a = a.with_options(options.clone()).index(None).await.unwrap();
            let b = b.with_options(options).index(None).await.unwrap();
            assert_eq!(a, b, "depth {depth}");
        }
    }

    #[tokio::test]
    async fn test_no_prefix_listed_twice() {
        let store = Arc::new(
            MockStore::with_files(FILES)
                .with_alias(None, "GT-100")
                .with_alias(Some("GT-100/errors"), "GT-100")
                .with_alias(Some("BROTHER HSM/manuals"), "BROTHER HSM")
                .with_alias(Some("BROTHER HSM"), "GT-100/errors"),
        );
        let (indexer, _) = indexer(store.clone(), true);
        let indexer = indexer.with_options(IndexOptions { max_depth: 10, ..IndexOptions::default() });
        let index = indexer.index(None).await.unwrap();
        assert!(index.entries("GT-100").is_some());

        let listed = store.listed().await;
        let unique: HashSet<_> = listed.iter().collect();
        assert_eq!(unique.len(), listed.len(), "listed twice: {listed:?}");
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let store = Arc::new(MockStore::with_files(FILES));
        let (indexer, _) = indexer(store.clone(), true);
        let shallow = indexer.with_options(IndexOptions { max_depth: 0, ..IndexOptions::default() });
        let folder = shallow.folder("BROTHER HSM", None).await.unwrap();
        assert_eq!(paths(&folder.value), vec!["BROTHER HSM/3034D.PDF"]);

        let deep = shallow.with_options(IndexOptions { max_depth: 2, ..IndexOptions::default() });
        let folder = deep.folder("BROTHER HSM", None).await.unwrap();
        assert_eq!(folder.value.len(), 3);
    }

    #[tokio::test]
    async fn test_root_prefix() {
        let store = Arc::new(MockStore::with_files(["library/JUKI/DDL-8700.pdf", "other/JUKI/ignored.pdf"]));
        let (indexer, _) = indexer(store, true);
        let indexer = indexer.with_options(IndexOptions {
            root_prefix: Some(PathBuf::from("library")),
            ..IndexOptions::default()
        });
        assert_eq!(indexer.top_level_folders().await.unwrap().value, vec!["JUKI".to_string()]);
        let folder = indexer.folder("JUKI", None).await.unwrap();
        assert_eq!(paths(&folder.value), vec!["library/JUKI/DDL-8700.pdf"]);
    }

    #[tokio::test]
    async fn test_root_prefix_applies_to_whole_index() {
        let store = Arc::new(MockStore::with_files([
            "library/readme.pdf",
            "library/JUKI/DDL-8700.pdf",
            "other/JUKI/ignored.pdf",
            "top.pdf",
        ]));
        let cache = Arc::new(MemoryCache::default());
        let connectivity = Connectivity::new(true);
        let indexer = RepositoryIndexer::new(store, cache, connectivity.clone()).with_options(IndexOptions {
            root_prefix: Some(PathBuf::from("library")),
            ..IndexOptions::default()
        });

        let live = indexer.index(None).await.unwrap();
        assert_eq!(live.folders.keys().collect::<Vec<_>>(), vec![ROOT_FOLDER, "JUKI"]);
        assert_eq!(paths(live.entries(ROOT_FOLDER).unwrap()), vec!["library/readme.pdf"]);
        assert_eq!(live.entries("JUKI").unwrap(), indexer.folder("JUKI", None).await.unwrap().value.as_slice());
        assert_eq!(live.entries(ROOT_FOLDER).unwrap(), indexer.folder(ROOT_FOLDER, None).await.unwrap().value.as_slice());

        connectivity.set_online(false);
        let cached = indexer.index(None).await.unwrap();
        assert_eq!(cached.document_count(), live.document_count());
        assert_eq!(cached.entries("JUKI"), live.entries("JUKI"));
    }

    #[tokio::test]
    async fn test_folder_named_root_is_kept_apart_from_root_files() {
        let (indexer, _) = indexer(Arc::new(MockStore::with_files(["readme.pdf", "Root/manual.pdf"])), true);
        let index = indexer.index(None).await.unwrap();
        assert_eq!(paths(index.entries("Root").unwrap()), vec!["Root/manual.pdf"]);
        assert_eq!(paths(index.entries(ROOT_FOLDER).unwrap()), vec!["readme.pdf"]);
        assert_eq!(index.document_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_root_is_not_a_folder() {
        let store = Arc::new(MockStore::with_files(["JUKI/DDL-8700.pdf"]));
        let cache = Arc::new(MemoryCache::default());
        let connectivity = Connectivity::new(true);
        let indexer = RepositoryIndexer::new(store, cache, connectivity.clone());
        let live = indexer.index(None).await.unwrap();
        assert!(live.entries(ROOT_FOLDER).is_none());

        connectivity.set_online(false);
        let cached = indexer.index(None).await.unwrap();
        assert!(cached.entries(ROOT_FOLDER).is_none());
        assert!(cached.uncached.is_empty());
    }

    #[tokio::test]
    async fn test_model_filter_only_checks_file_names() {
        let (indexer, _) = indexer(Arc::new(MockStore::with_files(FILES)), true);
        let folder = indexer.folder("GT-100", Some("GT-100")).await.unwrap();
        assert_eq!(paths(&folder.value), vec!["GT-100/GT-100_parts.pdf", "GT-100/errors/gt-100 error codes.pdf"]);
        assert!(folder.value.iter().all(|e| e.name.to_lowercase().contains("gt-100")));
        assert_eq!(folder.value[1].category, Category::ErrorCode);
    }

    #[tokio::test]
    async fn test_offline_cache_miss_is_distinct_from_empty() {
        let store = Arc::new(MockStore::with_files(FILES));
        let cache = Arc::new(MemoryCache::with_entries([(CacheKey::folder("EMPTY").to_string(), "[]")]));
        let indexer = RepositoryIndexer::new(store.clone(), cache, Connectivity::new(false));

        let err = indexer.folder("GT-100", None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CacheMiss(key) if key == "@cachedSubfolder_GT-100"));
        let empty = indexer.folder("EMPTY", None).await.unwrap();
        assert_eq!(empty, Sourced::cached(Vec::new()));
        let err = indexer.top_level_folders().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CacheMiss(_)));
        assert!(store.listed().await.is_empty(), "offline reads must not touch the store");
    }

    #[tokio::test]
    async fn test_live_results_are_served_offline() {
        let store = Arc::new(MockStore::with_files(FILES));
        let cache = Arc::new(Database::connect_in_memory().await.unwrap().repository());
        let connectivity = Connectivity::new(true);
        let indexer = RepositoryIndexer::new(store.clone(), cache, connectivity.clone());

        let live = indexer.index(None).await.unwrap();
        connectivity.set_online(false);
        let listed = store.listed().await.len();
        let cached = indexer.index(None).await.unwrap();
        assert_eq!(store.listed().await.len(), listed);
        assert!(cached.uncached.is_empty());
        assert_eq!(cached.folders.keys().collect::<Vec<_>>(), live.folders.keys().collect::<Vec<_>>());
        for (folder, sourced) in &cached.folders {
            assert_eq!(sourced.source, Source::Cache);
            assert_eq!(sourced.value, live.folders[folder].value);
        }
        let folders = indexer.top_level_folders().await.unwrap();
        assert_eq!(folders, Sourced::cached(vec!["BROTHER HSM".to_string(), "GT-100".to_string()]));
    }

    #[tokio::test]
    async fn test_offline_index_reports_uncached_folders() {
        let cache = Arc::new(MemoryCache::with_entries([
            (CacheKey::folders().to_string(), r#"["A","B"]"#.to_string()),
            (CacheKey::folder("A").to_string(), r#"[{"name":"a.pdf","path":"A/a.pdf","url":"u"}]"#.to_string()),
        ]));
        let indexer = RepositoryIndexer::new(Arc::new(MockStore::default()), cache, Connectivity::new(false));
        let index = indexer.index(None).await.unwrap();
        assert_eq!(index.folders.len(), 1);
        assert_eq!(index.uncached.iter().collect::<Vec<_>>(), vec!["B"]);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry() {
        let cache = Arc::new(MemoryCache::with_entries([(CacheKey::folder("A").to_string(), "not json")]));
        let indexer = RepositoryIndexer::new(Arc::new(MockStore::default()), cache, Connectivity::new(false));
        let err = indexer.folder("A", None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Serialization));
    }

    #[tokio::test]
    async fn test_transport_error() {
        let store = Arc::new(MockStore::with_files(FILES));
        store.fail_listing(Some("GT-100/errors")).await;
        let (indexer, cache) = indexer(store, true);
        let err = indexer.folder("GT-100", None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Transport));
        assert!(err.is_retryable());
        assert_eq!(cache.writes(), 0);
    }

    #[tokio::test]
    async fn test_fallback_is_explicit_and_tagged() {
        let record = vec![DocumentEntry::new(&ObjectRef::new("GT-100/sample.pdf"), "https://example.com/s".to_string())];
        let (disabled, _) = indexer(Arc::new(MockStore::with_files(FILES)), true);
        let disabled = disabled.with_fallback(FallbackPolicy::disabled().with_record("GT-100", record.clone()));
        assert_eq!(disabled.folder("GT-100", Some("S-7300A")).await.unwrap(), Sourced::live(Vec::new()));

        let (enabled, _) = indexer(Arc::new(MockStore::with_files(FILES)), true);
        let enabled = enabled.with_fallback(FallbackPolicy::enabled().with_record("GT-100", record.clone()));
        assert_eq!(enabled.folder("GT-100", Some("S-7300A")).await.unwrap(), Sourced::fallback(record));
        assert_eq!(enabled.folder("GT-100", None).await.unwrap().source, Source::Live);
    }

    #[tokio::test]
    async fn test_user_manuals() {
        let store = Arc::new(MockStore::with_files([
            "UserManuals/S-7300A_Catalogue.pdf",
            "UserManuals/S-7300A_Error.pdf",
            "UserManuals/S-7300A_Parts.pdf",
            "UserManuals/GT-100_Parts.pdf",
            "UserManuals/archive/S-7300A_Instruction.pdf",
        ]));
        let (indexer, _) = indexer(store, true);
        let manuals = indexer.user_manuals(None, Some("s-7300a")).await.unwrap();
        assert_eq!(manuals.source, Source::Live);
        assert_eq!(manuals.get(Category::Catalogue).len(), 1);
        assert_eq!(manuals.get(Category::ErrorCode).len(), 1);
        assert_eq!(manuals.get(Category::PartsBook).len(), 1);
        assert!(manuals.get(Category::InstructionManual).is_empty(), "manuals are not traversed recursively");
        assert_eq!(manuals.get(Category::PartsBook)[0].display_name(Some("S-7300A")), "S-7300A Parts book");

        let none = indexer.user_manuals(None, Some("JUKI")).await.unwrap();
        assert!(none.is_empty());
        let indexer = indexer.with_fallback(FallbackPolicy::enabled().with_sample_manuals("https://example.com"));
        let samples = indexer.user_manuals(None, Some("JUKI")).await.unwrap();
        assert_eq!(samples.source, Source::Fallback);
        assert_eq!(samples.get(Category::Catalogue)[0].display_name(Some("JUKI")), "[Catalogue] JUKI");
        assert!(samples.get(Category::Uncategorized).is_empty());
    }

    #[tokio::test]
    async fn test_index_stream_events() {
        let store = Arc::new(MockStore::with_files(FILES).with_yields(Some("BROTHER HSM"), 3));
        store.fail_listing(Some("GT-100")).await;
        let (indexer, _) = indexer(store, true);
        let events: Vec<_> = indexer.index_stream(None).collect().await;
        assert!(matches!(events[0], Ok(IndexEvent::Started)));
        assert!(matches!(events[1], Ok(IndexEvent::FoldersDiscovered(2))));
        let quick: HashSet<_> = events[2..4]
            .iter()
            .map(|event| match event {
                Ok(IndexEvent::FolderFailed { folder, .. }) => format!("failed {folder}"),
                Ok(IndexEvent::FolderIndexed { folder, entries, .. }) => format!("indexed {folder} {}", entries.len()),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(quick, HashSet::from(["failed GT-100".to_string(), format!("indexed {ROOT_FOLDER} 1")]));
        assert!(matches!(&events[4], Ok(IndexEvent::FolderIndexed { folder, entries, source: Source::Live })
            if folder == "BROTHER HSM" && entries.len() == 2));
        assert!(matches!(events[5], Ok(IndexEvent::Complete)));
        assert_eq!(events.len(), 6);
    }

    #[tokio::test]
    async fn test_index_stream_matches_index() {
        let store = Arc::new(MockStore::with_files(FILES));
        let cache = Arc::new(MemoryCache::default());
        let connectivity = Connectivity::new(true);
        let repository = RepositoryIndexer::new(store, cache, connectivity.clone());
        let index = repository.index(None).await.unwrap();

        for online in [true, false] {
            connectivity.set_online(online);
            let streamed: BTreeMap<_, _> = repository
                .index_stream(None)
                .filter_map(|event| async move {
                    match event {
                        Ok(IndexEvent::FolderIndexed { folder, entries, .. }) => Some((folder, entries)),
                        _ => None,
                    }
                })
                .collect()
                .await;
            let expected: BTreeMap<_, _> = index.folders.iter().map(|(k, v)| (k.clone(), v.value.clone())).collect();
            assert_eq!(streamed, expected, "online: {online}");
        }

        let (bare, _) = indexer(Arc::new(MockStore::with_files(["JUKI/DDL-8700.pdf"])), true);
        let events: Vec<_> = bare.index_stream(None).collect().await;
        assert_eq!(events.len(), 4, "no event for an empty root");
    }

    #[tokio::test]
    async fn test_index_stream_fails_without_folder_list() {
        let (indexer, _) = indexer(Arc::new(MockStore::with_files(FILES)), false);
        let events: Vec<_> = indexer.index_stream(None).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], Err(e) if matches!(&**e, ErrorKind::CacheMiss(_))));
    }
}
