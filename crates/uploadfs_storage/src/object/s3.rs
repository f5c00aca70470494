//! Amazon S3 and S3-compatible stores.

use super::{ObjectCore, caching_header, http_client, infer_endpoint, strip_scheme};
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

const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";

fn default_true() -> bool {
    true
}

fn default_public_acl() -> String {
    "public-read".to_string()
}

fn default_private_acl() -> String {
    "private".to_string()
}

/// S3 backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,
    /// Region, used only as the account part of the replica identity
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint host, with or without scheme
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force TLS when inferring the endpoint scheme
    #[serde(default)]
    pub secure: Option<bool>,
    /// Endpoint port
    #[serde(default)]
    pub port: Option<u16>,
    /// `path` for path-style addressing, anything else for virtual hosts
    #[serde(default)]
    pub style: Option<String>,
    /// Build public URLs with `https`
    #[serde(default = "default_true")]
    pub https: bool,
    /// ACL applied to enabled objects
    #[serde(default = "default_public_acl")]
    pub bucket_objects_acl: String,
    /// ACL applied to disabled objects
    #[serde(default = "default_private_acl")]
    pub disabled_bucket_objects_acl: String,
    /// Seconds for `Cache-Control: public, max-age=N`
    #[serde(default)]
    pub caching_time: Option<u64>,
    /// Bearer token sent with every request
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

impl S3Config {
    /// Settings for `bucket` on AWS with every default.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: None,
            endpoint: None,
            secure: None,
            port: None,
            style: None,
            https: true,
            bucket_objects_acl: default_public_acl(),
            disabled_bucket_objects_acl: default_private_acl(),
            caching_time: None,
            bearer_token: None,
            query_credential: None,
            no_gzip_extensions: None,
            add_no_gzip_extensions: Vec::new(),
        }
    }

    fn path_style(&self) -> bool {
        self.style.as_deref() == Some("path")
    }

    fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => infer_endpoint(endpoint, self.secure, self.port),
            None => format!("https://{}", DEFAULT_ENDPOINT),
        }
    }

    /// Base URL objects are addressed from.
    ///
    /// # Examples
    ///
    /// ```
    /// use uploadfs_storage::S3Config;
    ///
    /// let config = S3Config::new("media");
    /// assert_eq!(config.base_url(), "https://media.s3.amazonaws.com");
    ///
    /// let mut minio = S3Config::new("media");
    /// minio.endpoint = Some("localhost".to_string());
    /// minio.port = Some(9000);
    /// minio.style = Some("path".to_string());
    /// minio.https = false;
    /// assert_eq!(minio.base_url(), "http://localhost:9000/media");
    /// ```
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https://" } else { "http://" };
        self.url_with_scheme(scheme)
    }

    fn client_url(&self) -> String {
        let endpoint = self.endpoint();
        let scheme = if endpoint.starts_with("http://") {
            "http://"
        } else {
            "https://"
        };
        self.url_with_scheme(scheme)
    }

    fn url_with_scheme(&self, scheme: &str) -> String {
        let endpoint = self.endpoint();
        let host = strip_scheme(&endpoint);
        if self.path_style() {
            format!("{}{}/{}", scheme, host, self.bucket)
        } else {
            format!("{}{}.{}", scheme, self.bucket, host)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.is_empty() {
            return Err(ConfigError::missing("bucket", "s3"));
        }
        Ok(())
    }
}

/// S3 storage. Disable and enable swap canned ACLs.
#[derive(Debug)]
pub struct S3Storage {
    core: ObjectCore,
    base_url: String,
    public_acl: String,
    private_acl: String,
}

impl S3Storage {
    /// Connect over HTTP using the configured endpoint.
    #[instrument(skip(config), fields(bucket = %config.bucket))]
    pub async fn init(config: &S3Config) -> UploadfsResult<Self> {
        config.validate()?;
        let target = BackendTarget::new(
            config.region.clone().unwrap_or_else(|| "s3".to_string()),
            &config.bucket,
        );
        let client = http_client(
            target,
            config.client_url(),
            config.bearer_token.as_deref(),
            config.query_credential.as_deref(),
        );
        Self::with_client(config, client)
    }

    /// Use an existing object client, for SDK adapters and tests.
    pub fn with_client(config: &S3Config, client: Arc<dyn ObjectClient>) -> UploadfsResult<Self> {
        config.validate()?;
        let gzip = GzipPolicy::new(
            config.no_gzip_extensions.as_deref(),
            &config.add_no_gzip_extensions,
        );
        info!(replica = %client.target(), "Initialized s3 storage");
        Ok(Self {
            core: ObjectCore::new(
                ReplicaSet::single(client),
                gzip,
                caching_header(config.caching_time),
            ),
            base_url: config.base_url(),
            public_acl: config.bucket_objects_acl.clone(),
            private_acl: config.disabled_bucket_objects_acl.clone(),
        })
    }
}

#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    fn name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self, local, options), fields(path = %path))]
    async fn copy_in(
        &self,
        local: &Path,
        path: &StoragePath,
        options: &CopyOptions,
    ) -> UploadfsResult<()> {
        self.core
            .upload(local, path, options, Some(self.public_acl.as_str()))
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
        self.core
            .replicas()
            .set_acl(path.as_key(), &self.public_acl)
            .await
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn disable(&self, path: &StoragePath) -> UploadfsResult<()> {
        self.core
            .replicas()
            .set_acl(path.as_key(), &self.private_acl)
            .await
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn destroy(&self) -> UploadfsResult<()> {
        Ok(())
    }
}
