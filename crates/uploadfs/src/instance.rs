//! The `Uploadfs` entry point.

use crate::config::{CdnConfig, UploadfsConfig};
use crate::pipeline::{CopyImageOptions, DerivativePipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uploadfs_core::{CopyImageResult, ImageInfo, ImageSize, StoragePath, join_url};
use uploadfs_error::UploadfsResult;
use uploadfs_image::{ImageBackend, select_backend};
use uploadfs_storage::{CopyOptions, StorageBackend, connect};

/// A configured storage instance.
///
/// Holds one storage backend and one image backend. Several instances
/// with different configurations can coexist in one process.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use uploadfs::{CopyImageOptions, Uploadfs, UploadfsConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fs = Uploadfs::init(&UploadfsConfig::load()?).await?;
/// let stored = fs
///     .copy_image_in(Path::new("upload.jpg"), "/images/me", &CopyImageOptions::default())
///     .await?;
/// println!("{}", fs.url(&format!("{}.full.{}", stored.base_path, stored.extension)));
/// fs.destroy().await?;
/// # Ok(())
/// # }
/// ```
pub struct Uploadfs {
    storage: Arc<dyn StorageBackend>,
    images: Arc<dyn ImageBackend>,
    image_sizes: Vec<ImageSize>,
    temp_path: PathBuf,
    scaled_jpeg_quality: u8,
    orient_originals: bool,
    copy_original: bool,
    cdn: Option<CdnConfig>,
}

impl std::fmt::Debug for Uploadfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploadfs")
            .field("storage", &self.storage.name())
            .field("images", &self.images.name())
            .field("image_sizes", &self.image_sizes)
            .field("temp_path", &self.temp_path)
            .field("cdn", &self.cdn)
            .finish()
    }
}

fn parse(path: &str) -> UploadfsResult<StoragePath> {
    Ok(StoragePath::parse(path)?)
}

impl Uploadfs {
    /// Connect the configured storage backend and pick an image backend.
    ///
    /// # Errors
    ///
    /// `ConfigError` for invalid settings, or whatever the storage
    /// backend's initialization reports.
    #[instrument(skip(config), fields(backend = config.storage.backend_name()))]
    pub async fn init(config: &UploadfsConfig) -> UploadfsResult<Self> {
        config.validate()?;
        let storage = connect(&config.storage).await?;
        let images = select_backend(config.image);
        let fs = Self::with_backends(config, storage, images)?;
        info!(images = fs.images.name(), sizes = fs.image_sizes.len(), "Uploadfs ready");
        Ok(fs)
    }

    /// Build an instance around already constructed backends.
    ///
    /// Only the non-storage settings of `config` are used.
    ///
    /// # Errors
    ///
    /// `ConfigError` for invalid settings.
    pub fn with_backends(
        config: &UploadfsConfig,
        storage: Arc<dyn StorageBackend>,
        images: Arc<dyn ImageBackend>,
    ) -> UploadfsResult<Self> {
        config.validate()?;
        let temp_path = config
            .temp_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("uploadfs"));
        Ok(Self {
            storage,
            images,
            image_sizes: config.image_sizes.clone(),
            temp_path,
            scaled_jpeg_quality: config.scaled_jpeg_quality,
            orient_originals: config.orient_originals,
            copy_original: config.copy_original,
            cdn: config.cdn.clone(),
        })
    }

    /// Copy a local file into storage at `path` (starting with `/`).
    #[instrument(skip(self, local, options), fields(local = %local.display()))]
    pub async fn copy_in(
        &self,
        local: &Path,
        path: &str,
        options: &CopyOptions,
    ) -> UploadfsResult<()> {
        self.storage.copy_in(local, &parse(path)?, options).await
    }

    /// Copy an object out of storage into a local file.
    ///
    /// # Errors
    ///
    /// `StorageErrorKind::NotFound` when the object is absent or disabled.
    #[instrument(skip(self, local, options), fields(local = %local.display()))]
    pub async fn copy_out(
        &self,
        path: &str,
        local: &Path,
        options: &CopyOptions,
    ) -> UploadfsResult<()> {
        self.storage.copy_out(&parse(path)?, local, options).await
    }

    /// Remove an object.
    #[instrument(skip(self))]
    pub async fn remove(&self, path: &str) -> UploadfsResult<()> {
        self.storage.remove(&parse(path)?).await
    }

    /// Make a disabled object reachable again.
    ///
    /// Call this before relying on `copy_out` for a disabled object; some
    /// backends block reads as well as web access.
    #[instrument(skip(self))]
    pub async fn enable(&self, path: &str) -> UploadfsResult<()> {
        self.storage.enable(&parse(path)?).await
    }

    /// Block web access to an object without deleting it.
    #[instrument(skip(self))]
    pub async fn disable(&self, path: &str) -> UploadfsResult<()> {
        self.storage.disable(&parse(path)?).await
    }

    /// Public URL of `path`. An empty path yields the base URL.
    ///
    /// An enabled CDN replaces the backend's own base URL.
    pub fn url(&self, path: &str) -> String {
        match &self.cdn {
            Some(cdn) if cdn.enabled => join_url(&cdn.url, path),
            _ => self.storage.url(path),
        }
    }

    /// Store an image and its configured derivatives.
    ///
    /// Leave the extension off `path` to have the true format appended.
    /// See [`DerivativePipeline::run`] for naming and failure behavior.
    pub async fn copy_image_in(
        &self,
        local: &Path,
        path: &str,
        options: &CopyImageOptions,
    ) -> UploadfsResult<CopyImageResult> {
        self.pipeline().run(local, path, options).await
    }

    /// Identify a local image without storing it.
    pub async fn identify_local_image(&self, local: &Path) -> UploadfsResult<ImageInfo> {
        self.images.identify(local).await
    }

    /// The derivative pipeline with this instance's settings.
    pub fn pipeline(&self) -> DerivativePipeline<'_> {
        DerivativePipeline {
            storage: self.storage.as_ref(),
            images: self.images.as_ref(),
            sizes: &self.image_sizes,
            temp_path: &self.temp_path,
            copy_original: self.copy_original,
            orient_originals: self.orient_originals,
            jpeg_quality: self.scaled_jpeg_quality,
        }
    }

    /// Configured derivative sizes.
    pub fn image_sizes(&self) -> &[ImageSize] {
        &self.image_sizes
    }

    /// Parent directory of derivative workspaces.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// The storage backend.
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// The image backend.
    pub fn images(&self) -> &Arc<dyn ImageBackend> {
        &self.images
    }

    /// Switch disabled objects to disabled-path renames.
    pub async fn migrate_to_disabled_file_key(&self) -> UploadfsResult<()> {
        self.storage.migrate_to_disabled_file_key().await
    }

    /// Switch disabled-path renames back to the backend's native mechanism.
    pub async fn migrate_from_disabled_file_key(&self) -> UploadfsResult<()> {
        self.storage.migrate_from_disabled_file_key().await
    }

    /// Stop background work. Stored content is untouched.
    #[instrument(skip(self))]
    pub async fn destroy(&self) -> UploadfsResult<()> {
        debug!("Destroying backends");
        self.storage.destroy().await?;
        self.images.destroy().await
    }
}
