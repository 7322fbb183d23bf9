//! Persistent key-value cache for offline browsing.
//!
//! This crate provides the cache that lets folio show a manual library
//! without a network connection. The cache is not the source of truth - the
//! blob store is. Every entry is a derived snapshot of a listing, overwritten
//! on every successful live fetch and only read back while offline. If the
//! database is deleted it is rebuilt the next time the library is browsed
//! online.
//!
//! # Architecture
//! - [`KeyValueCache`]: the get/set seam the indexer talks to.
//! - [`Database`] and [`Repository`]: the SQLite-backed implementation.
//! - `MemoryCache` (feature `mock`): an in-memory implementation for tests.

mod db;
pub mod error;
#[cfg(feature = "mock")]
mod memory;
mod models;
mod repo;
mod store;

pub use crate::db::Database;
#[cfg(feature = "mock")]
pub use crate::memory::MemoryCache;
pub use crate::models::{CacheEntry, CacheKey};
pub use crate::repo::Repository;
pub use crate::store::KeyValueCache;
use std::sync::Arc;

pub type CacheHandle = Arc<dyn KeyValueCache + Send + Sync>;
