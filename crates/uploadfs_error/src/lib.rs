//! Error types for the uploadfs library.
//!
//! This crate provides the error taxonomy shared by every storage and image
//! backend, so callers can write backend-agnostic error handling.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! | Condition | Type |
//! |---|---|
//! | Missing or invalid option | [`ConfigError`] |
//! | Filesystem or network failure | [`StorageError`] with [`StorageErrorKind::Io`] or [`StorageErrorKind::Http`] |
//! | Object absent | [`StorageError`] with [`StorageErrorKind::NotFound`] |
//! | One or more mirrors failed | [`ReplicaError`] |
//! | Image tool failure | [`TranscodeError`] |
//!
//! # Examples
//!
//! ```
//! use uploadfs_error::{StorageError, StorageErrorKind, UploadfsResult};
//!
//! fn fetch() -> UploadfsResult<Vec<u8>> {
//!     Err(StorageError::new(StorageErrorKind::NotFound("/a.txt".to_string())))?
//! }
//!
//! let err = fetch().unwrap_err();
//! assert!(err.is_not_found());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod replica;
mod storage;
mod transcode;

pub use config::ConfigError;
pub use error::{UploadfsError, UploadfsErrorKind, UploadfsResult};
pub use replica::{ReplicaError, ReplicaErrorKind, ReplicaFailure};
pub use storage::{StorageError, StorageErrorKind};
pub use transcode::{TranscodeError, TranscodeErrorKind};
