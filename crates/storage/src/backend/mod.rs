//! Blob store trait and implementations.
//!
//! This module defines the [`BlobStore`] trait, a read-only view of a
//! hierarchical object store (local filesystem, S3-compatible services, etc.)
//! exposing exactly the two operations the indexer needs: list the direct
//! children of a prefix, and turn a leaf object into a download URL.

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalStore;
#[cfg(feature = "mock")]
pub use self::mock::MockStore;
#[cfg(feature = "s3")]
pub use self::s3::S3Store;
use crate::error::Result;
use crate::models::{Listing, ObjectRef};
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for hierarchical object stores.
///
/// All operations are asynchronous and may suspend the caller on network
/// I/O. Callers must not assume the store is acyclic: a listing may return a
/// prefix that was already seen elsewhere.
///
/// # Path Handling
/// All paths are relative to the store root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation. The root itself is addressed as `None`.
///
/// # Examples
///
/// ```
/// use folio_storage::{BlobStore, error::Result};
///
/// async fn count_manuals(store: &dyn BlobStore) -> Result<usize> {
///     let mut count = 0;
///     for folder in store.list_children(None).await?.prefixes {
///         count += store.list_children(Some(&folder.full_path)).await?.items.len();
///     }
///     Ok(count)
/// }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// List the direct children of a prefix (`None` for the store root).
    ///
    /// Returns the complete child set; implementations follow any
    /// pagination internally. Listing a prefix that does not exist returns
    /// an empty [`Listing`], not an error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use folio_storage::{BlobStore, error::Result};
    /// # async fn example(store: &dyn BlobStore) -> Result<()> {
    /// let listing = store.list_children(Some(Path::new("UserManuals"))).await?;
    /// for item in &listing.items {
    ///     println!("{}", item.full_path.display());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn list_children(&self, prefix: Option<&Path>) -> Result<Listing>;

    /// Resolve a leaf object to a URL it can be downloaded from.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use folio_storage::ObjectRef;
    /// # use folio_storage::{BlobStore, error::Result};
    /// # async fn example(store: &dyn BlobStore) -> Result<()> {
    /// let url = store.download_url(&ObjectRef::new("BROTHER HSM/3034D.PDF")).await?;
    /// println!("{url}");
    /// # Ok(())
    /// # }
    /// ```
    async fn download_url(&self, item: &ObjectRef) -> Result<String>;
}
