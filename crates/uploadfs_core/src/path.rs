//! Canonical storage paths.

use std::path::{Path, PathBuf};
use uploadfs_error::{StorageError, StorageErrorKind};

/// A validated object path.
///
/// Callers address objects with POSIX-style paths that begin with `/`.
/// Internally the leading slash is dropped, so the same value can be used
/// as an object-store key or joined onto a local root.
///
/// # Examples
///
/// ```
/// use uploadfs_core::StoragePath;
///
/// let path = StoragePath::parse("/a/b/c/t.txt").unwrap();
/// assert_eq!(path.as_key(), "a/b/c/t.txt");
/// assert_eq!(path.to_string(), "/a/b/c/t.txt");
/// assert_eq!(path.parent().unwrap().as_key(), "a/b/c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("/{}", _0)]
pub struct StoragePath(String);

impl StoragePath {
    /// Parse and normalize a path.
    ///
    /// Repeated slashes collapse. Empty paths, `.` and `..` segments and
    /// NUL bytes are rejected.
    ///
    /// # Errors
    ///
    /// Returns `StorageErrorKind::InvalidPath` for paths that cannot name
    /// an object.
    #[track_caller]
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        if path.contains('\0') {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(
                path.replace('\0', "\\0"),
            )));
        }
        let mut segments = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(StorageError::new(StorageErrorKind::InvalidPath(
                    path.to_string(),
                )));
            }
            segments.push(segment);
        }
        if segments.is_empty() {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(
                path.to_string(),
            )));
        }
        Ok(Self(segments.join("/")))
    }

    /// The path without a leading slash, as used for object keys.
    pub fn as_key(&self) -> &str {
        &self.0
    }

    /// Number of path components.
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }

    /// The containing directory, or `None` when the parent is the root.
    pub fn parent(&self) -> Option<StoragePath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| StoragePath(parent.to_string()))
    }

    /// Final component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Extension of the final component, if any.
    pub fn extension(&self) -> Option<&str> {
        split_extension(self.file_name()).1
    }

    /// Append a raw suffix to the final component.
    pub fn with_suffix(&self, suffix: &str) -> StoragePath {
        StoragePath(format!("{}{}", self.0, suffix))
    }

    /// Resolve against a local directory.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl std::str::FromStr for StoragePath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `name` into base and extension.
///
/// Only a trailing run of word characters after the last `.` of the final
/// component counts as an extension.
///
/// # Examples
///
/// ```
/// use uploadfs_core::split_extension;
///
/// assert_eq!(split_extension("/images/me.jpg"), ("/images/me", Some("jpg")));
/// assert_eq!(split_extension("/images/me"), ("/images/me", None));
/// assert_eq!(split_extension("/v1.2/me"), ("/v1.2/me", None));
/// ```
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    let file_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    match name[file_start..].rfind('.') {
        Some(dot) => {
            let dot = file_start + dot;
            let ext = &name[dot + 1..];
            if !ext.is_empty() && ext.chars().all(|c| c.is_alphanumeric() || c == '_') {
                (&name[..dot], Some(ext))
            } else {
                (name, None)
            }
        }
        None => (name, None),
    }
}

/// Join a base URL and an object path with exactly one slash between them.
///
/// An empty path yields the base URL unchanged.
pub fn join_url(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path)
}
