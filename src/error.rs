//! CLI Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration could not be loaded")]
    Config,
    #[display("blob store could not be opened")]
    Storage,
    #[display("S3 storage is configured but folio was built without the `s3` feature")]
    S3Unsupported,
    #[display("offline cache could not be opened")]
    Cache,
    #[display("indexing failed")]
    Index,
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("viewer failed")]
    Viewer,
    #[display("could not write output")]
    Output,
}
