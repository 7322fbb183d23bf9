//! The key-value seam between the indexer and its offline cache.

use crate::error::Result;
use crate::models::CacheEntry;
use async_trait::async_trait;

/// Persistent get/set string store.
///
/// Values are opaque strings (folio stores JSON). Writes are
/// last-writer-wins: entries are derived, re-computable state.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entry(key).await?.map(|entry| entry.value))
    }

    /// Fetch the full entry (including when it was written).
    async fn entry(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
