pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::BlobStore;
pub use crate::models::{Listing, ObjectRef};
pub use crate::path::{to_key, validate as validate_path};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn BlobStore + Send + Sync>;
