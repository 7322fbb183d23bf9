//! Layered configuration for folio.
//!
//! Layers, lowest priority first:
//! 1. built-in defaults ([`Config::default`]);
//! 2. a config file (`toml`, `yaml`/`yml` or `json`), either passed
//!    explicitly or `folio.toml` in the platform config directory;
//! 3. `FOLIO_`-prefixed environment variables, with `__` separating nested
//!    keys (`FOLIO_INDEX__MAX_DEPTH=2`).

pub mod error;
mod models;

pub use crate::models::{CacheConfig, Config, FallbackConfig, IndexConfig, StorageConfig, ViewerConfig};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "FOLIO_";
const DEFAULT_FILE_NAME: &str = "folio.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "folio")
}

/// Platform data directory (`~/.local/share/folio` on Linux).
pub(crate) fn data_dir() -> PathBuf {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_else(|| PathBuf::from(".folio"))
}

/// Default config file location, if the platform has a config directory.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
}

fn file_figment(path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let figment = Figment::new();
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

/// Load the configuration.
///
/// An explicit `path` must exist; the default config file is optional.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    match path {
        Some(path) => {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = figment.merge(file_figment(path)?);
        },
        None => {
            if let Some(default) = default_config_file().filter(|p| p.is_file()) {
                figment = figment.merge(file_figment(&default)?);
            }
        },
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
    config.validate()?;
    tracing::debug!(?config.index, ?config.viewer, "Configuration loaded");
    Ok(config)
}

impl Config {
    /// Reject values that deserialize fine but can't be used.
    pub fn validate(&self) -> Result<()> {
        match &self.storage {
            StorageConfig::Local { root } if !root.is_absolute() => {
                exn::bail!(ErrorKind::Invalid(format!("local storage root must be absolute: {}", root.display())))
            },
            StorageConfig::S3 { bucket, .. } if bucket.trim().is_empty() => {
                exn::bail!(ErrorKind::Invalid("S3 bucket must not be empty".to_string()))
            },
            _ => {},
        }
        let viewer = &self.viewer;
        if !(viewer.scale.is_finite() && viewer.scale > 0.0) {
            exn::bail!(ErrorKind::Invalid(format!("viewer scale must be positive: {}", viewer.scale)));
        }
        if !(viewer.device_pixel_ratio.is_finite() && viewer.device_pixel_ratio > 0.0) {
            exn::bail!(ErrorKind::Invalid(format!(
                "device pixel ratio must be positive: {}",
                viewer.device_pixel_ratio
            )));
        }
        if viewer.highlight_open.is_empty() {
            exn::bail!(ErrorKind::Invalid("highlight marker must not be empty".to_string()));
        }
        Ok(())
    }
}
