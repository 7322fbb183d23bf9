//! S3-compatible blob store.
//!
//! Lists prefixes with the `/` delimiter (so one call maps to one folder
//! level) and hands out presigned GET URLs for leaf objects. Works with AWS
//! S3, Backblaze B2, Tigris, MinIO and other S3-compatible services.

use crate::error::{ErrorKind, Result};
use crate::models::{Listing, ObjectRef};
use crate::{BlobStore, validate_path};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    presigning::PresigningConfig,
};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;
/// Presigned URLs stay valid for one hour by default.
const DEFAULT_URL_TTL: Duration = Duration::from_secs(60 * 60);
const DELIMITER: &str = "/";

/// S3-compatible blob store.
///
/// All paths are relative to the configured key prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use folio_storage::backend::S3Store;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = S3Store::new(
///     "manuals",
///     "my-bucket",
///     Some("library/".to_string()),
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com".to_string()),
///     "access_key_id",
///     "secret_access_key",
/// ).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Store {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    url_ttl: Duration,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Store {
    /// Create a new S3 blob store.
    ///
    /// # Arguments
    /// * `name` - A name for this store (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as the store root)
    /// * `region` - AWS region or provider-specific region
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub async fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix
            .map(validate_path)
            .transpose()?
            .map(|p| p.to_str().map(|s| s.to_string()).ok_or_raise(|| ErrorKind::InvalidPath(p)))
            .transpose()?;
        let credentials = Credentials::new(key_id, key_secret, None, None, "folio-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Path-style addressing for S3-compatible services.
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            prefix,
            url_ttl: DEFAULT_URL_TTL,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Change how long presigned download URLs stay valid.
    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    /// Construct the full S3 key from a relative path.
    fn full_key(&self, path: &Path) -> Result<String> {
        let key = crate::to_key(path)?;
        Ok(join_key(self.prefix.as_deref(), &key))
    }

    /// Key prefix (with trailing delimiter) to list the children of `prefix`.
    fn list_prefix(&self, prefix: Option<&Path>) -> Result<String> {
        let key = match prefix {
            Some(path) => self.full_key(path)?,
            None => match &self.prefix {
                Some(root) => root.trim_end_matches(DELIMITER).to_string(),
                None => return Ok(String::new()),
            },
        };
        Ok(format!("{key}{DELIMITER}"))
    }

    /// Strip the configured prefix from an S3 key to get relative path.
    fn relative_path(&self, key: &str) -> Result<PathBuf> {
        validate_path(strip_root(self.prefix.as_deref(), key))
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("request limiter closed".to_string()))
    }
}

fn join_key(root: Option<&str>, key: &str) -> String {
    match root {
        Some(root) => format!("{}{DELIMITER}{key}", root.trim_end_matches(DELIMITER)),
        None => key.to_string(),
    }
}

fn strip_root<'a>(root: Option<&str>, key: &'a str) -> &'a str {
    match root {
        Some(root) => {
            let root = root.trim_end_matches(DELIMITER);
            key.strip_prefix(root).and_then(|s| s.strip_prefix(DELIMITER)).unwrap_or(key)
        },
        None => key,
    }
}

#[async_trait]
impl BlobStore for S3Store {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_children(&self, prefix: Option<&Path>) -> Result<Listing> {
        let key_prefix = self.list_prefix(prefix)?;
        let mut listing = Listing::default();
        let mut continuation: Option<String> = None;
        loop {
            let _permit = self.acquire_permit().await?;
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&key_prefix)
                .delimiter(DELIMITER)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| ErrorKind::Network(e.to_string()))?;
            for object in output.contents() {
                // Zero-byte "folder marker" objects are an S3 console habit.
                match object.key() {
                    Some(key) if !key.ends_with(DELIMITER) => listing.items.push(ObjectRef::new(self.relative_path(key)?)),
                    _ => {},
                }
            }
            for common in output.common_prefixes() {
                if let Some(key) = common.prefix() {
                    listing.prefixes.push(ObjectRef::new(self.relative_path(key)?));
                }
            }
            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => continuation = Some(token.to_string()),
                _ => break,
            }
        }
        tracing::trace!(store = %self.name, prefix = %key_prefix, items = listing.items.len(), prefixes = listing.prefixes.len(), "Listed S3 prefix");
        Ok(listing)
    }

    async fn download_url(&self, item: &ObjectRef) -> Result<String> {
        let key = self.full_key(&item.full_path)?;
        let presigning = PresigningConfig::expires_in(self.url_ttl)
            .or_raise(|| ErrorKind::BackendError("invalid presigned URL lifetime".to_string()))?;
        let _permit = self.acquire_permit().await?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| ErrorKind::Network(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}
