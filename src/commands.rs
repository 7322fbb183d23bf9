//! Sub-command implementations.
//!
//! Each command builds what it needs from the configuration, does its work,
//! and renders the result as text. Rendering is kept separate from printing
//! so it can be tested.

use crate::cli::Command;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_cache::{CacheHandle, Database};
use folio_config::{Config, StorageConfig, ViewerConfig};
use folio_index::{
    Category, Connectivity, DEFAULT_SAMPLE_BASE_URL, DocumentEntry, FallbackPolicy, GroupedDocuments, Index,
    IndexEvent, IndexOptions, RepositoryIndexer, Source,
};
use folio_storage::StoreHandle;
use folio_storage::backend::LocalStore;
use folio_viewer::{
    DocumentSource, HighlightMarkers, HostCommand, MockRenderer, OpenDocument, RenderMode, RendererHandle,
    ViewerEvent, ViewerOptions, ViewerSession,
};
use futures::StreamExt;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Index { model, offline, filter, progress, json } => {
            let library = Library::open(config, !offline).await?;
            let model = model.as_deref();
            let output = if progress {
                index_with_progress(&library.indexer, model).await
            } else {
                library.index(model).await.and_then(|index| {
                    if json { index_json(&index) } else { Ok(render_index(&index, filter.as_deref(), model)) }
                })
            };
            library.close().await;
            print!("{}", output?);
        },
        Command::Folders { offline } => {
            let library = Library::open(config, !offline).await?;
            let folders = library.indexer.top_level_folders().await.or_raise(|| ErrorKind::Index);
            library.close().await;
            let folders = folders?;
            tracing::debug!(source = %folders.source, "Folders listed");
            for folder in folders.value {
                println!("{folder}");
            }
        },
        Command::Manuals { model, offline } => {
            let library = Library::open(config, !offline).await?;
            let manuals = library.indexer.user_manuals(None, model.as_deref()).await.or_raise(|| ErrorKind::Index);
            library.close().await;
            print!("{}", render_manuals(&manuals?, model.as_deref()));
        },
        Command::Search { document, query } => {
            let json = tokio::fs::read_to_string(&document).await.or_raise(|| ErrorKind::Read(document.clone()))?;
            let matches = search_document(&json, &query, &config.viewer).await?;
            if matches.is_empty() {
                println!("No matches for {query:?}");
            }
            for (page, spans) in matches {
                for span in spans {
                    println!("page {page}: {span}");
                }
            }
        },
    }
    Ok(())
}

/// An indexer wired to the configured store and the on-disk cache.
struct Library {
    indexer: RepositoryIndexer,
    database: Database,
}

impl Library {
    async fn open(config: &Config, online: bool) -> Result<Self> {
        let store = open_store(&config.storage).await?;
        let path = config.cache.resolved_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Cache)?;
        }
        let database = Database::connect(&path).await.or_raise(|| ErrorKind::Cache)?;
        let cache: CacheHandle = Arc::new(database.repository());
        let indexer = RepositoryIndexer::new(store, cache, Connectivity::new(online))
            .with_options(index_options(config))
            .with_fallback(fallback_policy(config));
        tracing::debug!(online, cache = %path.display(), "Library opened");
        Ok(Self { indexer, database })
    }

    async fn index(&self, model: Option<&str>) -> Result<Index> {
        self.indexer.index(model).await.or_raise(|| ErrorKind::Index)
    }

    async fn close(self) {
        self.database.close().await;
    }
}

async fn open_store(config: &StorageConfig) -> Result<StoreHandle> {
    match config {
        StorageConfig::Local { root } => {
            let store = LocalStore::new("local", root).or_raise(|| ErrorKind::Storage)?;
            Ok(Arc::new(store))
        },
        #[cfg(feature = "s3")]
        StorageConfig::S3 { bucket, prefix, region, endpoint, key_id, key_secret } => {
            let store = folio_storage::backend::S3Store::new(
                "s3",
                bucket,
                prefix.clone(),
                region,
                endpoint.clone(),
                key_id,
                key_secret,
            )
            .await
            .or_raise(|| ErrorKind::Storage)?;
            Ok(Arc::new(store))
        },
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3 { .. } => exn::bail!(ErrorKind::S3Unsupported),
    }
}

fn index_options(config: &Config) -> IndexOptions {
    IndexOptions {
        root_prefix: config.index.root_prefix.as_ref().map(PathBuf::from),
        max_depth: config.index.max_depth,
        manuals_prefix: PathBuf::from(&config.index.manuals_prefix),
    }
}

fn fallback_policy(config: &Config) -> FallbackPolicy {
    let fallback = &config.index.fallback;
    if !fallback.enabled {
        return FallbackPolicy::disabled();
    }
    let base_url = fallback.sample_base_url.as_deref().unwrap_or(DEFAULT_SAMPLE_BASE_URL);
    FallbackPolicy::enabled().with_sample_manuals(base_url)
}

fn viewer_options(config: &ViewerConfig) -> ViewerOptions {
    ViewerOptions {
        mode: if config.lazy { RenderMode::Lazy } else { RenderMode::Eager },
        scale: config.scale,
        device_pixel_ratio: config.device_pixel_ratio,
        markers: HighlightMarkers { open: config.highlight_open.clone(), close: config.highlight_close.clone() },
    }
}

async fn index_with_progress(indexer: &RepositoryIndexer, model: Option<&str>) -> Result<String> {
    let mut output = String::new();
    let mut events = std::pin::pin!(indexer.index_stream(model));
    while let Some(event) = events.next().await {
        match event.or_raise(|| ErrorKind::Index)? {
            IndexEvent::FoldersDiscovered(folders) => tracing::info!(folders, "Indexing"),
            IndexEvent::FolderIndexed { folder, entries, source } => {
                let section = render_folder(&folder, source, entries.iter(), model);
                // Show each folder as soon as it's done.
                print!("{section}");
            },
            IndexEvent::FolderFailed { folder, error } => {
                tracing::error!(%folder, %error, "Folder could not be indexed");
                let _ = writeln!(output, "{folder} (failed: {error})");
            },
            IndexEvent::Started | IndexEvent::Complete => {},
        }
    }
    Ok(output)
}

fn render_folder<'a>(
    folder: &str,
    source: Source,
    files: impl Iterator<Item = &'a DocumentEntry>,
    model: Option<&str>,
) -> String {
    let mut output = format!("{folder} ({source})\n");
    for file in files {
        let _ = writeln!(output, "  [{}] {}  {}", file.category, file.display_name(model), file.url);
    }
    output
}

fn render_index(index: &Index, filter: Option<&str>, model: Option<&str>) -> String {
    let mut output = String::new();
    for found in index.filter(filter.unwrap_or_default()) {
        let source = index.folders.get(found.folder).map_or(Source::Live, |sourced| sourced.source);
        output.push_str(&render_folder(found.folder, source, found.files.into_iter(), model));
    }
    for folder in &index.uncached {
        let _ = writeln!(output, "{folder} (no cached data)");
    }
    output
}

fn index_json(index: &Index) -> Result<String> {
    let folders: serde_json::Map<String, serde_json::Value> = index
        .folders
        .iter()
        .map(|(folder, sourced)| Ok((folder.clone(), serde_json::to_value(&sourced.value)?)))
        .collect::<std::result::Result<_, serde_json::Error>>()
        .or_raise(|| ErrorKind::Output)?;
    let mut json = serde_json::to_string_pretty(&folders).or_raise(|| ErrorKind::Output)?;
    json.push('\n');
    Ok(json)
}

fn render_manuals(manuals: &GroupedDocuments, model: Option<&str>) -> String {
    let mut output = String::new();
    if manuals.source != Source::Live {
        let _ = writeln!(output, "({})", manuals.source);
    }
    for category in Category::ALL {
        let _ = writeln!(output, "{category}");
        let entries = manuals.get(category);
        if entries.is_empty() {
            output.push_str("  (none)\n");
        }
        for entry in entries {
            let _ = writeln!(output, "  {}  {}", entry.display_name(model), entry.url);
        }
    }
    output
}

/// Render every page of a JSON document description, search it, and return
/// the highlighted spans of each matching page.
async fn search_document(json: &str, query: &str, config: &ViewerConfig) -> Result<Vec<(u32, Vec<String>)>> {
    let renderer: RendererHandle = Arc::new(MockRenderer::from_json(json).or_raise(|| ErrorKind::Viewer)?);
    let options = ViewerOptions { mode: RenderMode::Eager, ..viewer_options(config) };
    let (events, mut receiver) = mpsc::channel(32);
    let source = DocumentSource::Bytes(json.as_bytes().to_vec());
    let session = ViewerSession::open(source, renderer, options, events).await.or_raise(|| ErrorKind::Viewer)?;
    let (handle, commands) = session.handle(4);

    let listen = async {
        let mut matched = Vec::new();
        while let Some(event) = receiver.recv().await {
            match event {
                ViewerEvent::SearchUpdated { matched_pages, .. } => matched = matched_pages,
                ViewerEvent::PageFailed(page) => tracing::warn!(page, "Page could not be rendered"),
                event => tracing::trace!(?event, "Viewer event"),
            }
        }
        matched
    };
    let drive = async {
        handle.send(HostCommand::Search(query.to_string())).await?;
        handle.send(HostCommand::Close).await
    };
    let (document, matched, sent) = tokio::join!(session.run(commands), listen, drive);
    sent.or_raise(|| ErrorKind::Viewer)?;
    Ok(highlights(&document, &matched))
}

fn highlights(document: &OpenDocument, pages: &[u32]) -> Vec<(u32, Vec<String>)> {
    pages
        .iter()
        .filter_map(|&page| document.page(page))
        .map(|page| {
            let spans = page
                .text_spans()
                .iter()
                .filter(|span| span.is_highlighted())
                .map(|span| span.display_text().to_string())
                .collect();
            (page.page_number(), spans)
        })
        .collect()
}
