//! Storage models.
//!
//! These types describe what a [`BlobStore`](crate::BlobStore) returns when
//! listing a prefix: leaf objects and the folder-like prefixes below it.

use std::path::{Path, PathBuf};

/// Reference to a leaf object or a folder-like prefix in a blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Last path component (the file or folder name)
    pub name: String,
    /// Full path relative to the store root
    pub full_path: PathBuf,
}
impl ObjectRef {
    /// Create a reference from a full path, deriving the name from its last
    /// component.
    pub fn new(full_path: impl Into<PathBuf>) -> Self {
        let full_path = full_path.into();
        let name = full_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Self { name, full_path }
    }

    /// The prefix this object lives under, or `None` for objects at the root.
    pub fn parent(&self) -> Option<&Path> {
        self.full_path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Complete child set of one prefix.
///
/// Backends are responsible for following pagination; a listing is always the
/// full set of direct children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Leaf objects directly under the prefix
    pub items: Vec<ObjectRef>,
    /// Folder-like prefixes directly under the prefix
    pub prefixes: Vec<ObjectRef>,
}
impl Listing {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_name() {
        let object = ObjectRef::new("BROTHER HSM/3034D.PDF");
        assert_eq!(object.name, "3034D.PDF");
        assert_eq!(object.parent(), Some(Path::new("BROTHER HSM")));
    }

    #[test]
    fn test_object_ref_at_root() {
        let object = ObjectRef::new("readme.pdf");
        assert_eq!(object.name, "readme.pdf");
        assert_eq!(object.parent(), None);
    }
}
