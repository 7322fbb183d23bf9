//! Manual library indexing.
//!
//! Walks a [`BlobStore`](folio_storage::BlobStore) of PDF manuals into a
//! folder → documents index, caching every live listing so the library can be
//! browsed offline.
//!
//! # Architecture
//! - [`RepositoryIndexer`]: bounded breadth-first traversal, URL resolution,
//!   model filtering and the offline cache.
//! - [`Connectivity`]: the online/offline switch the indexer consults before
//!   every live call.
//! - [`FallbackPolicy`]: opt-in substitute data for empty listings.
//! - [`BrowserController`]: folder browser state driven by the indexer.
//! - [`classify`] and [`filter_folders`]: pure helpers used when displaying
//!   documents.

pub mod browser;
mod classify;
mod connectivity;
pub mod error;
mod fallback;
mod filter;
mod indexer;
mod models;

pub use crate::browser::{BrowserController, BrowserState, Load, Notice};
pub use crate::classify::{Category, classify};
pub use crate::connectivity::Connectivity;
pub use crate::fallback::{DEFAULT_SAMPLE_BASE_URL, FallbackPolicy, sample_manuals};
pub use crate::filter::{FolderMatch, filter_folders};
pub use crate::indexer::{DEFAULT_MANUALS_PREFIX, DEFAULT_MAX_DEPTH, IndexEvent, IndexOptions, MAX_FOLDER_CONCURRENCY, RepositoryIndexer};
pub use crate::models::{DocumentEntry, GroupedDocuments, Index, ROOT_FOLDER, RepositoryNode, Source, Sourced};
