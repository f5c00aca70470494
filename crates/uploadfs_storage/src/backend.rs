//! Storage trait definition.

use std::path::Path;
use uploadfs_core::StoragePath;
use uploadfs_error::UploadfsResult;

/// Per-call options for `copy_in` and `copy_out`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Content type to record instead of the one derived from the extension
    pub content_type: Option<String>,
    /// Force (`Some(true)`) or forbid (`Some(false)`) gzip transport encoding
    pub gzip: Option<bool>,
}

impl CopyOptions {
    /// Override the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Override the gzip decision of the backend's policy.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = Some(gzip);
        self
    }
}

/// Trait for pluggable storage backends.
///
/// Each implementation owns its connection setup (performed by its `init`
/// constructor) and normalizes every failure into [`uploadfs_error`]
/// types, so callers can switch backends without touching error handling.
///
/// Paths are [`StoragePath`]s; the local file side is a plain filesystem path.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend name for logs (`local`, `s3`, `gcs`, `azure`).
    fn name(&self) -> &'static str;

    /// Copy a local file into storage.
    ///
    /// Intermediate directories are created as needed and an existing object
    /// at `path` is overwritten.
    async fn copy_in(&self, local: &Path, path: &StoragePath, options: &CopyOptions)
    -> UploadfsResult<()>;

    /// Copy an object out of storage into a local file.
    ///
    /// The caller always receives decoded bytes, whatever transport
    /// encoding was used on upload.
    ///
    /// # Errors
    ///
    /// `StorageErrorKind::NotFound` when the object is absent or disabled
    /// by renaming.
    async fn copy_out(&self, path: &StoragePath, local: &Path, options: &CopyOptions)
    -> UploadfsResult<()>;

    /// Remove an object.
    async fn remove(&self, path: &StoragePath) -> UploadfsResult<()>;

    /// Make a previously disabled object reachable again.
    async fn enable(&self, path: &StoragePath) -> UploadfsResult<()>;

    /// Block public access to an object.
    ///
    /// Some backends also block `copy_out`; call `enable` before relying on
    /// read access again.
    async fn disable(&self, path: &StoragePath) -> UploadfsResult<()>;

    /// Public URL for `path`. An empty path yields the base URL.
    fn url(&self, path: &str) -> String;

    /// Release timers and handles. Does not remove any content.
    async fn destroy(&self) -> UploadfsResult<()>;

    /// Convert objects disabled by other means to disabled-path renames.
    async fn migrate_to_disabled_file_key(&self) -> UploadfsResult<()> {
        Ok(())
    }

    /// Convert disabled-path renames back to the backend's other mechanism.
    async fn migrate_from_disabled_file_key(&self) -> UploadfsResult<()> {
        Ok(())
    }
}
