//! Viewer Error Types
//!
//! A failure to render one page, or to resolve one outline destination, is
//! local to that page or item. Only [`ErrorKind::Open`] is fatal to a
//! viewer session.

use derive_more::{Display, Error};

/// A viewer error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for viewer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("document could not be opened")]
    Open,
    #[display("page {_0} could not be rendered")]
    Render(#[error(not(source))] u32),
    #[display("outline could not be loaded")]
    Outline,
    #[display("outline destination could not be resolved")]
    Destination,
    #[display("viewer session is closed")]
    Closed,
    #[display("unknown host command: {_0}")]
    UnknownCommand(#[error(not(source))] String),
    #[display("invalid document description")]
    InvalidDocument,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Render(_) | Self::Destination)
    }
}
