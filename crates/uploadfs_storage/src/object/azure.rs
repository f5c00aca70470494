//! Azure Blob Storage with replicated clusters.

use super::{ObjectCore, http_client};
use crate::access::DisabledFileKey;
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

/// Cache-Control applied to every blob.
pub const AZURE_CACHE_CONTROL: &str = "max-age=2628000, public";

/// One storage account/container pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureCluster {
    /// Storage account name
    pub account: String,
    /// Container; falls back to the primary container when unset
    #[serde(default)]
    pub container: Option<String>,
    /// SAS token appended to every request
    #[serde(default)]
    pub sas_token: Option<String>,
    /// Blob endpoint override, `https://{account}.blob.core.windows.net` by default
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AzureCluster {
    fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", self.account))
    }
}

/// Azure backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Primary storage account
    pub account: String,
    /// Primary container
    pub container: String,
    /// SAS token for the primary account
    #[serde(default)]
    pub sas_token: Option<String>,
    /// Blob endpoint override for the primary account
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Secret for disabled-path renames, required
    #[serde(default)]
    pub disabled_file_key: Option<String>,
    /// Mirrors written alongside the primary
    #[serde(default)]
    pub replicate_clusters: Vec<AzureCluster>,
    /// Replaces the default list of extensions uploaded without gzip
    #[serde(default)]
    pub no_gzip_extensions: Option<Vec<String>>,
    /// Extends the list of extensions uploaded without gzip
    #[serde(default)]
    pub add_no_gzip_extensions: Vec<String>,
}

impl AzureConfig {
    /// Settings for one account/container with no replicas.
    pub fn new(account: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
            sas_token: None,
            endpoint: None,
            disabled_file_key: None,
            replicate_clusters: Vec::new(),
            no_gzip_extensions: None,
            add_no_gzip_extensions: Vec::new(),
        }
    }

    /// Use keyed renames for disable/enable.
    pub fn with_disabled_file_key(mut self, key: impl Into<String>) -> Self {
        self.disabled_file_key = Some(key.into());
        self
    }

    fn primary(&self) -> AzureCluster {
        AzureCluster {
            account: self.account.clone(),
            container: Some(self.container.clone()),
            sas_token: self.sas_token.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    /// Every cluster written to. The primary comes first and serves reads.
    pub fn clusters(&self) -> Vec<AzureCluster> {
        std::iter::once(self.primary())
            .chain(self.replicate_clusters.iter().cloned())
            .collect()
    }

    fn container_of<'a>(&'a self, cluster: &'a AzureCluster) -> &'a str {
        cluster.container.as_deref().unwrap_or(&self.container)
    }

    /// Public URL of the primary container.
    pub fn base_url(&self) -> String {
        join_url(&self.primary().endpoint(), &self.container)
    }

    fn validate(&self) -> Result<DisabledFileKey, ConfigError> {
        if self.account.is_empty() {
            return Err(ConfigError::missing("account", "azure"));
        }
        if self.container.is_empty() {
            return Err(ConfigError::missing("container", "azure"));
        }
        let secret = self
            .disabled_file_key
            .as_deref()
            .ok_or_else(|| ConfigError::missing("disabled_file_key", "azure"))?;
        DisabledFileKey::new(secret)
    }
}

/// Azure storage across one or more mirrored clusters.
///
/// Blob containers have no per-object ACL, so disabling renames the blob
/// to its keyed disabled path on every cluster.
#[derive(Debug)]
pub struct AzureStorage {
    core: ObjectCore,
    key: DisabledFileKey,
    base_url: String,
}

impl AzureStorage {
    /// Connect to every configured cluster over HTTP.
    #[instrument(skip(config), fields(account = %config.account, container = %config.container))]
    pub async fn init(config: &AzureConfig) -> UploadfsResult<Self> {
        config.validate()?;
        let clients = config
            .clusters()
            .iter()
            .map(|cluster| {
                let container = config.container_of(cluster);
                http_client(
                    BackendTarget::new(&cluster.account, container),
                    join_url(&cluster.endpoint(), container),
                    None,
                    cluster.sas_token.as_deref(),
                )
            })
            .collect();
        Self::with_clients(config, clients)
    }

    /// Use existing object clients, primary first.
    pub fn with_clients(
        config: &AzureConfig,
        clients: Vec<Arc<dyn ObjectClient>>,
    ) -> UploadfsResult<Self> {
        let key = config.validate()?;
        let replicas = ReplicaSet::new(clients)?;
        let gzip = GzipPolicy::new(
            config.no_gzip_extensions.as_deref(),
            &config.add_no_gzip_extensions,
        );
        info!(replicas = ?replicas.target_names(), "Initialized azure storage");
        Ok(Self {
            core: ObjectCore::new(replicas, gzip, Some(AZURE_CACHE_CONTROL.to_string())),
            key,
            base_url: config.base_url(),
        })
    }
}

#[async_trait::async_trait]
impl StorageBackend for AzureStorage {
    fn name(&self) -> &'static str {
        "azure"
    }

    #[instrument(skip(self, local, options), fields(path = %path))]
    async fn copy_in(
        &self,
        local: &Path,
        path: &StoragePath,
        options: &CopyOptions,
    ) -> UploadfsResult<()> {
        self.core.upload(local, path, options, None).await?;
        info!("Stored blob");
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
        info!("Removed blob");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn enable(&self, path: &StoragePath) -> UploadfsResult<()> {
        let hidden = self.key.disabled_path(path);
        self.core
            .replicas()
            .rename("enable", hidden.as_key(), path.as_key())
            .await?;
        info!("Enabled blob");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn disable(&self, path: &StoragePath) -> UploadfsResult<()> {
        let hidden = self.key.disabled_path(path);
        self.core
            .replicas()
            .rename("disable", path.as_key(), hidden.as_key())
            .await?;
        info!("Disabled blob");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn destroy(&self) -> UploadfsResult<()> {
        Ok(())
    }
}
