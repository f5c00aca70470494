//! Backend selection.

use crate::backend::StorageBackend;
use crate::local::{LocalConfig, LocalStorage};
use crate::object::{AzureConfig, AzureStorage, GcsConfig, GcsStorage, S3Config, S3Storage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uploadfs_error::UploadfsResult;

/// Settings for one storage backend, tagged by `backend`.
///
/// # Examples
///
/// ```
/// use uploadfs_storage::StorageConfig;
///
/// let config: StorageConfig = serde_json::from_str(
///     r#"{"backend": "local", "uploads_path": "/srv/uploads", "uploads_url": "/uploads"}"#,
/// ).unwrap();
/// assert_eq!(config.backend_name(), "local");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem
    Local(LocalConfig),
    /// Amazon S3 or compatible
    S3(S3Config),
    /// Google Cloud Storage
    Gcs(GcsConfig),
    /// Azure Blob Storage
    Azure(AzureConfig),
}

impl StorageConfig {
    /// The `backend` tag.
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageConfig::Local(_) => "local",
            StorageConfig::S3(_) => "s3",
            StorageConfig::Gcs(_) => "gcs",
            StorageConfig::Azure(_) => "azure",
        }
    }
}

/// Initialize the backend described by `config`.
///
/// # Errors
///
/// Whatever the backend's `init` reports, typically a `ConfigError`.
#[tracing::instrument(skip(config), fields(backend = config.backend_name()))]
pub async fn connect(config: &StorageConfig) -> UploadfsResult<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config {
        StorageConfig::Local(c) => Arc::new(LocalStorage::init(c).await?),
        StorageConfig::S3(c) => Arc::new(S3Storage::init(c).await?),
        StorageConfig::Gcs(c) => Arc::new(GcsStorage::init(c).await?),
        StorageConfig::Azure(c) => Arc::new(AzureStorage::init(c).await?),
    };
    Ok(backend)
}
