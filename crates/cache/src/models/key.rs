use derive_more::Display;

/// Key of a cached listing.
///
/// The key formats are stable: caches written by older builds stay readable.
#[derive(Debug, Clone, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);
impl CacheKey {
    /// Key for the list of top-level folder names.
    pub fn folders() -> Self {
        Self("@cachedFolders".to_string())
    }

    /// Key for the document listing of one folder.
    pub fn folder(name: impl AsRef<str>) -> Self {
        Self(format!("@cachedSubfolder_{}", name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CacheKey::folders(), "@cachedFolders")]
    #[case(CacheKey::folder("BROTHER HSM"), "@cachedSubfolder_BROTHER HSM")]
    #[case(CacheKey::folder("/"), "@cachedSubfolder_/")]
    fn test_key_format(#[case] key: CacheKey, #[case] expected: &str) {
        assert_eq!(key.as_str(), expected);
        assert_eq!(key.to_string(), expected);
    }
}
