use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::UtcDateTime;

/// A keyed snapshot of a listing, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    /// JSON-serialized payload
    pub value: String,
    /// When the snapshot was taken (second precision)
    pub written_at: UtcDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) written_at: i64,
}
impl From<&CacheEntry> for EntryRow {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            value: entry.value.clone(),
            written_at: entry.written_at.unix_timestamp(),
        }
    }
}
impl TryFrom<EntryRow> for CacheEntry {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.key,
            value: row.value,
            written_at: UtcDateTime::from_unix_timestamp(row.written_at)
                .or_raise(|| ErrorKind::InvalidData("written at"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_round_trip_drops_nanoseconds() {
        let now = UtcDateTime::now();
        let entry = CacheEntry {
            key: "@cachedFolders".to_string(),
            value: r#"["BROTHER HSM"]"#.to_string(),
            written_at: now,
        };
        let model = CacheEntry::try_from(EntryRow::from(&entry)).unwrap();
        assert_eq!(model.value, entry.value);
        // Converting to a Unix timestamp (measured in seconds) inherently strips the nanoseconds component.
        assert_eq!(model.written_at, now.replace_nanosecond(0).unwrap());
    }

    #[test]
    fn test_row_with_out_of_range_timestamp() {
        let row = EntryRow {
            key: "k".to_string(),
            value: "[]".to_string(),
            written_at: i64::MAX,
        };
        let err = CacheEntry::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(_)));
    }
}
