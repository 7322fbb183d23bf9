//! Index Error Types
//!
//! Transport failures and cache misses are kept apart: a caller must be able
//! to tell "the store could not be reached" from "there is nothing cached for
//! this key" from "the folder is empty" (which is not an error at all).

use derive_more::{Display, Error};

/// An index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not list or resolve objects in the blob store")]
    Transport,
    #[display("no cached data for key: {_0}")]
    CacheMiss(#[error(not(source))] String),
    #[display("offline cache failure")]
    Cache,
    #[display("could not (de)serialize cached listing")]
    Serialization,
    #[display("operation cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::Cache)
    }
}
