//! In-memory cache for testing.

use crate::error::Result;
use crate::models::CacheEntry;
use crate::store::KeyValueCache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::UtcDateTime;
use tokio::sync::RwLock;

/// In-memory [`KeyValueCache`] with read/write counters.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}
impl MemoryCache {
    /// Create a cache pre-populated with entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let now = UtcDateTime::now();
        let entries = entries
            .into_iter()
            .map(|(key, value)| {
                let key = key.into();
                (key.clone(), CacheEntry { key, value: value.into(), written_at: now })
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let entry = CacheEntry {
            key: key.to_string(),
            value: value.to_string(),
            written_at: UtcDateTime::now(),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}
