use crate::error::{Error, ErrorKind, Result};
use crate::indexer::RepositoryIndexer;
use crate::models::{DocumentEntry, ROOT_FOLDER, Source};
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};

/// Folders indexed at the same time by [`RepositoryIndexer::index_stream`].
pub const MAX_FOLDER_CONCURRENCY: usize = 8;

/// Progress events emitted by [`RepositoryIndexer::index_stream`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`FoldersDiscovered`](Self::FoldersDiscovered) exactly once, with the
///    number of top-level folders.
/// 3. [`FolderIndexed`](Self::FolderIndexed) or
///    [`FolderFailed`](Self::FolderFailed) once per folder, in completion
///    order. Files directly under the root come as one more folder named
///    [`ROOT_FOLDER`], only when there are any.
/// 4. [`Complete`](Self::Complete) exactly once.
///
/// If the folder list itself can't be obtained the stream yields that error
/// and ends without [`Complete`](Self::Complete).
#[derive(Debug)]
pub enum IndexEvent {
    Started,
    FoldersDiscovered(u64),
    FolderIndexed {
        folder: String,
        entries: Vec<DocumentEntry>,
        source: Source,
    },
    FolderFailed {
        folder: String,
        error: Error,
    },
    Complete,
}

impl RepositoryIndexer {
    /// Index every top-level folder, reporting progress as it goes. The
    /// folders reported match those of [`index`](Self::index).
    ///
    /// Each folder is its own traversal (see [`folder`](Self::folder)), run
    /// up to [`MAX_FOLDER_CONCURRENCY`] at a time. A failing folder is
    /// reported and the others carry on. Dropping the stream cancels any
    /// folders still in flight.
    pub fn index_stream<'a>(&'a self, model_filter: Option<&'a str>) -> impl Stream<Item = Result<IndexEvent>> + 'a {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            yield Ok(IndexEvent::Started);

            let folders = match self.top_level_folders().await {
                Ok(folders) => folders.value,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            yield Ok(IndexEvent::FoldersDiscovered(u64::try_from(folders.len()).unwrap_or(u64::MAX)));

            let mut pending: Vec<_> = folders
                .into_iter()
                .chain([ROOT_FOLDER.to_string()])
                .map(|folder| async move {
                    let result = self.folder(&folder, model_filter).await;
                    (folder, result)
                })
                .collect();
            let mut processing = FuturesUnordered::new();
            processing.extend(pending.drain(..MAX_FOLDER_CONCURRENCY.min(pending.len())));
            while let Some((folder, result)) = processing.next().await {
                let is_root = folder == ROOT_FOLDER;
                match result {
                    Ok(sourced) if is_root && sourced.value.is_empty() => {},
                    Err(error) if is_root && matches!(&*error, ErrorKind::CacheMiss(_)) => {},
                    Ok(sourced) => {
                        tracing::debug!(%folder, documents = sourced.value.len(), source = %sourced.source, "Folder indexed");
                        yield Ok(IndexEvent::FolderIndexed { folder, entries: sourced.value, source: sourced.source });
                    },
                    Err(error) => {
                        tracing::warn!(%folder, %error, "Folder could not be indexed");
                        yield Ok(IndexEvent::FolderFailed { folder, error });
                    },
                }
                // Pop-n-push, FIFO.
                if !pending.is_empty() {
                    processing.push(pending.remove(0));
                }
            }

            yield Ok(IndexEvent::Complete);
        })
    }
}
