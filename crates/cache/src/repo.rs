//! SQLite-backed implementation of [`KeyValueCache`].

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheEntry, EntryRow};
use crate::store::KeyValueCache;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;

/// Repository for cache entries.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

#[async_trait]
impl KeyValueCache for Repository {
    async fn entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_entry.sql"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(CacheEntry::try_from).transpose()
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let row = EntryRow::from(&CacheEntry {
            key: key.to_string(),
            value: value.to_string(),
            written_at: UtcDateTime::now(),
        });
        sqlx::query(include_str!("../queries/set_entry.sql"))
            .bind(row.key)
            .bind(row.value)
            .bind(row.written_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(key, "Cache entry written");
        Ok(())
    }
}
