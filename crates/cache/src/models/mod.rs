mod entry;
mod key;

pub(crate) use self::entry::EntryRow;
pub use self::entry::CacheEntry;
pub use self::key::CacheKey;
