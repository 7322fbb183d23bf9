//! Local filesystem blob store.
//!
//! Serves a directory tree as a blob store: directories are prefixes, regular
//! files are items, and download URLs are `file://` URLs. Useful for
//! mirrored manual libraries and for running folio without a network.

use crate::error::{ErrorKind, Result};
use crate::models::{Listing, ObjectRef};
use crate::{BlobStore, path::validate as validate_path};
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    Item(ObjectRef),
    Prefix(ObjectRef),
    Skip,
}

/// Local filesystem blob store.
///
/// All paths are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use folio_storage::backend::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("mirror", "/srv/manuals")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalStore {
    name: String,
    /// Root directory of the library
    root: PathBuf,
}
impl LocalStore {
    /// Create a new local filesystem store.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Non-async: happens once on start-up and isn't worth making
            // the constructor async for.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Get the absolute path for a relative storage path.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        validate_path(relative)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        let relative = self.relative_path(&path)?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Prefix(ObjectRef::new(relative)));
        }
        if metadata.is_file() {
            return Ok(WalkEntry::Item(ObjectRef::new(relative)));
        }
        // Note: silently drop what is most likely a symlink.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_children(&self, prefix: Option<&Path>) -> Result<Listing> {
        let directory = match prefix {
            Some(prefix) => self.absolute_path(prefix)?,
            None => self.root.clone(),
        };
        let mut entries = match fs::read_dir(&directory).await {
            Ok(entries) => entries,
            // To stay consistent with S3-compatible stores, listing a
            // prefix that doesn't exist is an empty listing.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Listing::default()),
            Err(err) => return Err(Self::map_io_error(err, &directory).into()),
        };
        let mut listing = Listing::default();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, &directory))? {
            match self.process_entry(entry).await? {
                WalkEntry::Item(item) => listing.items.push(item),
                WalkEntry::Prefix(prefix) => listing.prefixes.push(prefix),
                WalkEntry::Skip => {},
            }
        }
        // Directory iteration order is filesystem dependent.
        listing.items.sort();
        listing.prefixes.sort();
        tracing::trace!(store = %self.name, directory = %directory.display(), items = listing.items.len(), prefixes = listing.prefixes.len(), "Listed directory");
        Ok(listing)
    }

    async fn download_url(&self, item: &ObjectRef) -> Result<String> {
        let absolute = self.absolute_path(&item.full_path)?;
        let metadata = fs::metadata(&absolute).await.map_err(|e| Self::map_io_error(e, &item.full_path))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(item.full_path.clone()));
        }
        Ok(format!("file://{}", absolute.display()))
    }
}
