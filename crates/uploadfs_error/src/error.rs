//! Top-level error wrapper types.

use crate::{ConfigError, ReplicaError, StorageError, TranscodeError};

/// Every error an uploadfs operation can surface.
///
/// # Examples
///
/// ```
/// use uploadfs_error::{ConfigError, UploadfsError};
///
/// let err: UploadfsError = ConfigError::new("uploads_path not set").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum UploadfsErrorKind {
    /// Missing or invalid configuration
    #[from(ConfigError)]
    Config(ConfigError),
    /// Filesystem, network or lookup failure on a single target
    #[from(StorageError)]
    Storage(StorageError),
    /// One or more replicas failed
    #[from(ReplicaError)]
    Replica(ReplicaError),
    /// Image identification or conversion failed
    #[from(TranscodeError)]
    Transcode(TranscodeError),
}

/// uploadfs error with kind discrimination.
///
/// # Examples
///
/// ```
/// use uploadfs_error::{ConfigError, UploadfsResult};
///
/// fn might_fail() -> UploadfsResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("uploadfs Error: {}", _0)]
pub struct UploadfsError(Box<UploadfsErrorKind>);

impl UploadfsError {
    /// Create a new error from a kind.
    pub fn new(kind: UploadfsErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &UploadfsErrorKind {
        &self.0
    }

    /// Whether this error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), UploadfsErrorKind::Storage(e) if e.is_not_found())
    }
}

// Generic From implementation for any type that converts to UploadfsErrorKind
impl<T> From<T> for UploadfsError
where
    T: Into<UploadfsErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for uploadfs operations.
pub type UploadfsResult<T> = std::result::Result<T, UploadfsError>;
