//! uploadfs - backend-agnostic file storage
//!
//! Copy files in and out, remove them, toggle public access, and generate
//! scaled image derivatives without caring whether the bytes land on local
//! disk or in an object store.
//!
//! # Features
//!
//! - **Storage backends**: local filesystem, S3, Google Cloud Storage and
//!   Azure Blob Storage (with replicas), selected by configuration
//! - **Access control**: native ACLs where available, keyed path renames
//!   or permission bits elsewhere
//! - **Image derivatives**: one transcode pass per upload through
//!   ImageMagick or the pure-Rust `image` crate
//! - **Transport**: gzip for compressible uploads, decoded on download
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use uploadfs::{CopyOptions, Uploadfs, UploadfsConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UploadfsConfig::from_toml_str(r#"
//!     [storage]
//!     backend = "local"
//!     uploads_path = "/srv/uploads"
//!     uploads_url = "/uploads"
//! "#)?;
//! let fs = Uploadfs::init(&config).await?;
//! fs.copy_in(Path::new("notes.txt"), "/docs/notes.txt", &CopyOptions::default()).await?;
//! assert_eq!(fs.url("/docs/notes.txt"), "/uploads/docs/notes.txt");
//! fs.destroy().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `uploadfs-error` - Error types
//! - `uploadfs-core` - Paths, image metadata and the box-fit rule
//! - `uploadfs-storage` - Storage backends, access control, replication
//! - `uploadfs-image` - Image backends
//!
//! This crate wires them together and re-exports the commonly used items.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod instance;
mod observability;
mod pipeline;
mod workspace;

pub use config::{CdnConfig, ENV_PREFIX, UploadfsConfig};
pub use instance::Uploadfs;
pub use observability::{LoggingConfig, init_logging};
pub use pipeline::{CopyImageOptions, DerivativePipeline};
pub use workspace::TempWorkspace;

pub use uploadfs_core::{
    CopyImageResult, CropSpec, ImageInfo, ImageSize, Orientation, StoragePath, fit_within,
};
pub use uploadfs_error::{
    ConfigError, ReplicaError, ReplicaErrorKind, StorageError, StorageErrorKind, TranscodeError,
    TranscodeErrorKind, UploadfsError, UploadfsErrorKind, UploadfsResult,
};
pub use uploadfs_image::{
    ImageBackend, ImageBackendKind, ImageCrateBackend, ImageMagickBackend, select_backend,
};
pub use uploadfs_storage::{
    CopyOptions, DisabledFileKey, LocalConfig, LocalStorage, StorageBackend, StorageConfig,
    connect,
};
