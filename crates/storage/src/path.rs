//! Object path validation.
//!
//! Object stores use `/`-separated keys. Inside folio they are carried as
//! [`PathBuf`]s so prefixes compose with [`Path::join`] and compare
//! component-wise with [`Path::starts_with`].

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};
use exn::OptionExt;

/// Validates an object path for security and correctness.
/// Ensures that paths don't escape the store root (no `..` traversal).
///
/// > **Note:** Null bytes are explicitly rejected. The store root itself is
/// >           not a valid object path; callers pass `None` for it instead.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use folio_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("BROTHER HSM/3034D.PDF").is_ok());
/// assert!(validate_path("UserManuals/GT-100/parts.pdf").is_ok());
/// assert!(validate_path("a/../file.pdf").is_ok()); // (never leaves store root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../UserManuals//./GT-100/").unwrap(),
///     Path::new("UserManuals/GT-100")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls, reject them explicitly.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Validates a path and renders it as a `/`-separated object key.
///
/// ```
/// use folio_storage::to_key;
/// assert_eq!(to_key("UserManuals/./GT-100/").unwrap(), "UserManuals/GT-100");
/// ```
pub fn to_key(path: impl AsRef<Path>) -> Result<String> {
    let validated = validate(path)?;
    let parts = validated
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<&str>>>()
        .ok_or_raise(|| ErrorKind::InvalidPath(validated.clone()))?;
    Ok(parts.join("/"))
}
