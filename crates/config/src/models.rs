//! Configuration model.
//!
//! Every section has defaults, so an empty config file (or none at all) is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub index: IndexConfig,
    pub viewer: ViewerConfig,
}

/// Where the manual library lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// A directory tree on the local filesystem.
    Local { root: PathBuf },
    /// An S3-compatible bucket.
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        key_id: String,
        key_secret: String,
    },
}
impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local { root: crate::data_dir().join("library") }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite database file; defaults to `cache.sqlite` in the platform data
    /// directory.
    pub path: Option<PathBuf>,
}
impl CacheConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| crate::data_dir().join("cache.sqlite"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Prefix the traversal starts at (`None` for the store root).
    pub root_prefix: Option<String>,
    /// How many folder levels below each top-level folder are traversed.
    pub max_depth: usize,
    /// Prefix holding the flat user-manual listing.
    pub manuals_prefix: String,
    pub fallback: FallbackConfig,
}
impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root_prefix: None,
            max_depth: 1,
            manuals_prefix: "UserManuals".to_string(),
            fallback: FallbackConfig::default(),
        }
    }
}

/// Substitution of known-good sample entries for empty live results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    /// Base URL the sample manual URLs are built from.
    pub sample_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Render pages on first visibility instead of all at once.
    pub lazy: bool,
    pub scale: f32,
    pub device_pixel_ratio: f32,
    pub highlight_open: String,
    pub highlight_close: String,
}
impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            lazy: true,
            scale: 1.0,
            device_pixel_ratio: 1.0,
            highlight_open: "<mark>".to_string(),
            highlight_close: "</mark>".to_string(),
        }
    }
}
