//! Scratch directories for one derivative run.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uploadfs_error::{StorageError, UploadfsResult};

/// An exclusively owned temporary directory.
///
/// The directory and everything in it is removed when the workspace is
/// dropped, on success and failure paths alike. Removal failures are
/// logged and otherwise ignored.
#[derive(Debug)]
pub struct TempWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl TempWorkspace {
    /// Create a fresh directory under `parent`, or the system temp dir.
    ///
    /// # Errors
    ///
    /// `StorageErrorKind::Io` if the directory cannot be created.
    pub async fn create(parent: Option<&Path>) -> UploadfsResult<Self> {
        let parent = match parent {
            Some(p) => p.to_path_buf(),
            None => std::env::temp_dir(),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| StorageError::from_io(parent.display(), &e))?;

        let dir = tokio::task::spawn_blocking({
            let parent = parent.clone();
            move || tempfile::Builder::new().prefix("uploadfs-").tempdir_in(parent)
        })
        .await
        .map_err(|e| StorageError::from_io(parent.display(), &std::io::Error::other(e)))?
        .map_err(|e| StorageError::from_io(parent.display(), &e))?;

        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "Created workspace");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// The workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!(path = %self.path.display(), "Removed workspace"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove workspace"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removed_on_drop() {
        let parent = TempDir::new().unwrap();
        let workspace = TempWorkspace::create(Some(parent.path())).await.unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(path.join("scratch.jpg"), b"x").unwrap();
        assert!(path.is_dir());

        drop(workspace);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_creates_missing_parent() {
        let root = TempDir::new().unwrap();
        let parent = root.path().join("nested/tmp");
        let workspace = TempWorkspace::create(Some(&parent)).await.unwrap();
        assert!(workspace.path().starts_with(&parent));
    }

    #[tokio::test]
    async fn test_each_workspace_is_distinct() {
        let parent = TempDir::new().unwrap();
        let a = TempWorkspace::create(Some(parent.path())).await.unwrap();
        let b = TempWorkspace::create(Some(parent.path())).await.unwrap();
        assert_ne!(a.path(), b.path());
    }
}
