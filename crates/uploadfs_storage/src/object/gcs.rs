//! Google Cloud Storage.

use super::{ObjectCore, http_client, infer_endpoint, strip_scheme};
use crate::backend::{CopyOptions, StorageBackend};
use crate::client::{BackendTarget, ObjectClient};
use crate::replica::ReplicaSet;
use crate::transport::GzipPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use uploadfs_core::{StoragePath, join_url};
use uploadfs_error::{ConfigError, UploadfsResult};

const DEFAULT_ENDPOINT: &str = "storage.googleapis.com";
const PUBLIC_ACL: &str = "public-read";
const PRIVATE_ACL: &str = "private";

fn default_true() -> bool {
    true
}

/// GCS backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcsConfig {
    /// Bucket name
    pub bucket: String,
    /// Project owning the bucket, used in the replica identity
    #[serde(default)]
    pub project: Option<String>,
    /// Endpoint host, with or without scheme
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force TLS when inferring the endpoint scheme
    #[serde(default)]
    pub secure: Option<bool>,
    /// Endpoint port
    #[serde(default)]
    pub port: Option<u16>,
    /// Build public URLs with `https`
    #[serde(default = "default_true")]
    pub https: bool,
    /// Seconds for `Cache-Control: public, max-age=N`; `no-cache` when unset
    #[serde(default)]
    pub caching_time: Option<u64>,
    /// OAuth bearer token sent with every request
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Pre-signed query string appended to every request
    #[serde(default)]
    pub query_credential: Option<String>,
    /// Replaces the default list of extensions uploaded without gzip
    #[serde(default)]
    pub no_gzip_extensions: Option<Vec<String>>,
    /// Extends the list of extensions uploaded without gzip
    #[serde(default)]
    pub add_no_gzip_extensions: Vec<String>,
}

impl GcsConfig {
    /// Settings for `bucket` with every default.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            project: None,
            endpoint: None,
            secure: None,
            port: None,
            https: true,
            caching_time: None,
            bearer_token: None,
            query_credential: None,
            no_gzip_extensions: None,
            add_no_gzip_extensions: Vec::new(),
        }
    }

    fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => infer_endpoint(endpoint, self.secure, self.port),
            None => format!("https://{}", DEFAULT_ENDPOINT),
        }
    }

    /// Base URL of the bucket, `https://{bucket}.storage.googleapis.com` by default.
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint();
        let scheme = if self.https { "https://" } else { "http://" };
        format!("{}{}.{}", scheme, self.bucket, strip_scheme(&endpoint))
    }

    fn cache_control(&self) -> String {
        match self.caching_time {
            Some(secs) => format!("public, max-age={}", secs),
            None => "no-cache".to_string(),
        }
    }
}

/// GCS storage. Disable and enable toggle the object's public ACL.
#[derive(Debug)]
pub struct GcsStorage {
    core: ObjectCore,
    base_url: String,
}

impl GcsStorage {
    /// Connect over the XML API endpoint.
    #[instrument(skip(config), fields(bucket = %config.bucket))]
    pub async fn init(config: &GcsConfig) -> UploadfsResult<Self> {
        let target = BackendTarget::new(
            config.project.clone().unwrap_or_else(|| "gcs".to_string()),
            &config.bucket,
        );
        let endpoint = config.endpoint();
        let client = http_client(
            target,
            join_url(&endpoint, &config.bucket),
            config.bearer_token.as_deref(),
            config.query_credential.as_deref(),
        );
        Self::with_client(config, client)
    }

    /// Use an existing object client.
    pub fn with_client(config: &GcsConfig, client: Arc<dyn ObjectClient>) -> UploadfsResult<Self> {
        if config.bucket.is_empty() {
            return Err(ConfigError::missing("bucket", "gcs").into());
        }
        let gzip = GzipPolicy::new(
            config.no_gzip_extensions.as_deref(),
            &config.add_no_gzip_extensions,
        );
        info!(replica = %client.target(), "Initialized gcs storage");
        Ok(Self {
            core: ObjectCore::new(
                ReplicaSet::single(client),
                gzip,
                Some(config.cache_control()),
            ),
            base_url: config.base_url(),
        })
    }
}

#[async_trait::async_trait]
impl StorageBackend for GcsStorage {
    fn name(&self) -> &'static str {
        "gcs"
    }

    #[instrument(skip(self, local, options), fields(path = %path))]
    async fn copy_in(
        &self,
        local: &Path,
        path: &StoragePath,
        options: &CopyOptions,
    ) -> UploadfsResult<()> {
        self.core
            .upload(local, path, options, Some(PUBLIC_ACL))
            .await?;
        info!("Stored object");
        Ok(())
    }

    #[instrument(skip(self, local, _options), fields(path = %path))]
    async fn copy_out(
        &self,
        path: &StoragePath,
        local: &Path,
        _options: &CopyOptions,
    ) -> UploadfsResult<()> {
        self.core.download(path, local).await
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn remove(&self, path: &StoragePath) -> UploadfsResult<()> {
        self.core.replicas().delete(path.as_key()).await?;
        info!("Removed object");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn enable(&self, path: &StoragePath) -> UploadfsResult<()> {
        self.core.replicas().set_acl(path.as_key(), PUBLIC_ACL).await
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn disable(&self, path: &StoragePath) -> UploadfsResult<()> {
        self.core.replicas().set_acl(path.as_key(), PRIVATE_ACL).await
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn destroy(&self) -> UploadfsResult<()> {
        Ok(())
    }
}
