//! Storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Filesystem failure
    #[display("I/O failure: {}", _0)]
    Io(String),
    /// Remote request failure
    #[display("Remote request failed: {}", _0)]
    Http(String),
    /// Object not found at the specified location
    #[display("Object not found: {}", _0)]
    NotFound(String),
    /// Invalid storage path
    #[display("Invalid storage path: {}", _0)]
    InvalidPath(String),
    /// Permission denied when accessing storage
    #[display("Permission denied: {}", _0)]
    PermissionDenied(String),
    /// Operation not supported by this backend or client
    #[display("Unsupported operation: {}", _0)]
    Unsupported(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use uploadfs_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("/path/to/file".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Map an I/O error on `path` to a storage error.
    ///
    /// `NotFound` and `PermissionDenied` keep their meaning, everything
    /// else is reported as a transient I/O failure.
    #[track_caller]
    pub fn from_io(path: impl std::fmt::Display, err: &std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                StorageErrorKind::PermissionDenied(format!("{}: {}", path, err))
            }
            _ => StorageErrorKind::Io(format!("{}: {}", path, err)),
        };
        Self::new(kind)
    }

    /// Whether the error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StorageErrorKind::NotFound(_))
    }

    /// Whether the failure is a transient filesystem or network condition.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, StorageErrorKind::Io(_) | StorageErrorKind::Http(_))
    }
}
