//! Local filesystem backend.
//!
//! Objects live under `uploads_path` at their storage path and are served
//! by an external web server from `uploads_url`. Disabling either renames
//! the file to its keyed disabled path (when `disabled_file_key` is set)
//! or strips every permission bit so the web server cannot read it.

mod copy;
mod gc;

pub use copy::{MAX_COPY_ATTEMPTS, copy_file};
pub use gc::{DEFAULT_GC_INTERVAL, DirectoryGc};

use crate::access::{DisabledFileKey, is_disabled_path, path_from_disabled_path};
use crate::backend::{CopyOptions, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uploadfs_core::{StoragePath, join_url};
use uploadfs_error::{ConfigError, StorageError, StorageErrorKind, UploadfsResult};

fn default_gc_interval_ms() -> u64 {
    DEFAULT_GC_INTERVAL.as_millis() as u64
}

/// Local backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory objects are stored under
    pub uploads_path: PathBuf,
    /// URL the directory is served from
    pub uploads_url: String,
    /// Secret for disabled-path renames; permission bits are used without it
    #[serde(default)]
    pub disabled_file_key: Option<String>,
    /// Delay between empty-directory sweeps
    #[serde(default = "default_gc_interval_ms")]
    pub gc_interval_ms: u64,
}

impl LocalConfig {
    /// Settings with the default sweep interval and no disabled file key.
    pub fn new(uploads_path: impl Into<PathBuf>, uploads_url: impl Into<String>) -> Self {
        Self {
            uploads_path: uploads_path.into(),
            uploads_url: uploads_url.into(),
            disabled_file_key: None,
            gc_interval_ms: default_gc_interval_ms(),
        }
    }

    /// Use keyed renames for disable/enable.
    pub fn with_disabled_file_key(mut self, key: impl Into<String>) -> Self {
        self.disabled_file_key = Some(key.into());
        self
    }

    /// Override the sweep interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval_ms = interval.as_millis() as u64;
        self
    }
}

/// Local filesystem storage.
#[derive(Debug)]
pub struct LocalStorage {
    root: PathBuf,
    url: String,
    key: Option<DisabledFileKey>,
    gc: DirectoryGc,
}

impl LocalStorage {
    /// Validate settings, create the uploads directory and start the sweeper.
    ///
    /// # Errors
    ///
    /// `ConfigError` for an empty path or URL or an empty key, `Io` when the
    /// directory cannot be created.
    #[instrument(skip(config), fields(root = %config.uploads_path.display()))]
    pub async fn init(config: &LocalConfig) -> UploadfsResult<Self> {
        if config.uploads_path.as_os_str().is_empty() {
            return Err(ConfigError::missing("uploads_path", "local").into());
        }
        if config.uploads_url.is_empty() {
            return Err(ConfigError::missing("uploads_url", "local").into());
        }
        let key = config
            .disabled_file_key
            .as_deref()
            .map(DisabledFileKey::new)
            .transpose()?;

        tokio::fs::create_dir_all(&config.uploads_path)
            .await
            .map_err(|e| StorageError::from_io(config.uploads_path.display(), &e))?;

        let gc = DirectoryGc::start(
            &config.uploads_path,
            Duration::from_millis(config.gc_interval_ms),
        );
        info!(keyed = key.is_some(), "Initialized local storage");
        Ok(Self {
            root: config.uploads_path.clone(),
            url: config.uploads_url.clone(),
            key,
            gc,
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The empty-directory sweeper.
    pub fn gc(&self) -> &DirectoryGc {
        &self.gc
    }

    fn fs_path(&self, path: &StoragePath) -> PathBuf {
        path.to_fs_path(&self.root)
    }

    async fn rename(&self, from: &StoragePath, to: &StoragePath) -> UploadfsResult<()> {
        tokio::fs::rename(self.fs_path(from), self.fs_path(to))
            .await
            .map_err(|e| StorageError::from_io(from, &e))?;
        Ok(())
    }

    #[cfg(unix)]
    async fn set_mode(&self, path: &StoragePath, mode: u32) -> UploadfsResult<()> {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(self.fs_path(path), std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| StorageError::from_io(path, &e))?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn set_mode(&self, path: &StoragePath, _mode: u32) -> UploadfsResult<()> {
        Err(StorageError::new(StorageErrorKind::Unsupported(format!(
            "permission-based disable of {} requires disabled_file_key on this platform",
            path
        )))
        .into())
    }

    #[cfg(unix)]
    async fn mode(&self, path: &StoragePath) -> UploadfsResult<u32> {
        use std::os::unix::fs::PermissionsExt;
        let metadata = tokio::fs::metadata(self.fs_path(path))
            .await
            .map_err(|e| StorageError::from_io(path, &e))?;
        Ok(metadata.permissions().mode() & 0o777)
    }

    #[cfg(not(unix))]
    async fn mode(&self, _path: &StoragePath) -> UploadfsResult<u32> {
        Ok(0o644)
    }

    fn require_key(&self) -> UploadfsResult<&DisabledFileKey> {
        self.key.as_ref().ok_or_else(|| {
            ConfigError::new("disabled_file_key is required for this migration")
                .for_setting("disabled_file_key")
                .into()
        })
    }

    /// Every file under the root, as storage paths.
    pub async fn list_files(&self) -> UploadfsResult<Vec<StoragePath>> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| StorageError::from_io(dir.display(), &e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::from_io(dir.display(), &e))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StorageError::from_io(entry.path().display(), &e))?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                    let relative = relative.to_string_lossy().replace('\\', "/");
                    if let Ok(path) = StoragePath::parse(&relative) {
                        files.push(path);
                    }
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self, local, _options), fields(path = %path))]
    async fn copy_in(
        &self,
        local: &Path,
        path: &StoragePath,
        _options: &CopyOptions,
    ) -> UploadfsResult<()> {
        let bytes = copy_file(local, &self.fs_path(path)).await?;
        info!(bytes, "Stored file");
        Ok(())
    }

    #[instrument(skip(self, local, _options), fields(path = %path))]
    async fn copy_out(
        &self,
        path: &StoragePath,
        local: &Path,
        _options: &CopyOptions,
    ) -> UploadfsResult<()> {
        match copy_file(&self.fs_path(path), local).await {
            Ok(bytes) => {
                debug!(bytes, "Fetched file");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                Err(StorageError::new(StorageErrorKind::NotFound(path.to_string())).into())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn remove(&self, path: &StoragePath) -> UploadfsResult<()> {
        let result = match (tokio::fs::remove_file(self.fs_path(path)).await, &self.key) {
            (Err(e), Some(key)) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::remove_file(self.fs_path(&key.disabled_path(path))).await
            }
            (result, _) => result,
        };
        result.map_err(|e| StorageError::from_io(path, &e))?;
        self.gc.register(path.parent());
        info!("Removed file");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn enable(&self, path: &StoragePath) -> UploadfsResult<()> {
        match &self.key {
            Some(key) => self.rename(&key.disabled_path(path), path).await?,
            None => self.set_mode(path, 0o644).await?,
        }
        info!("Enabled file");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn disable(&self, path: &StoragePath) -> UploadfsResult<()> {
        match &self.key {
            Some(key) => self.rename(path, &key.disabled_path(path)).await?,
            None => self.set_mode(path, 0o000).await?,
        }
        info!("Disabled file");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.url, path)
    }

    async fn destroy(&self) -> UploadfsResult<()> {
        self.gc.stop().await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn migrate_to_disabled_file_key(&self) -> UploadfsResult<()> {
        let key = self.require_key()?;
        let mut migrated = 0;
        for path in self.list_files().await? {
            if is_disabled_path(&path) || self.mode(&path).await? != 0 {
                continue;
            }
            self.set_mode(&path, 0o644).await?;
            self.rename(&path, &key.disabled_path(&path)).await?;
            migrated += 1;
        }
        info!(migrated, "Migrated disabled files to keyed paths");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn migrate_from_disabled_file_key(&self) -> UploadfsResult<()> {
        self.require_key()?;
        let mut migrated = 0;
        for path in self.list_files().await? {
            if !is_disabled_path(&path) {
                continue;
            }
            let original = path_from_disabled_path(&path);
            self.rename(&path, &original).await?;
            self.set_mode(&original, 0o000).await?;
            migrated += 1;
        }
        info!(migrated, "Migrated keyed paths back to permission bits");
        Ok(())
    }
}
