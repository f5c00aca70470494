//! Pluggable storage backends for uploadfs.
//!
//! Every backend implements [`StorageBackend`], so callers copy files in
//! and out, remove them and toggle their public visibility without caring
//! whether bytes land on local disk or in an object store.
//!
//! # Backends
//!
//! - **local**: files under a directory served by a web server, with
//!   crash-safe copies and a background sweeper for empty directories
//! - **s3** / **gcs**: object stores with native ACLs
//! - **azure**: blob containers mirrored across clusters, with keyed
//!   disabled-path renames in place of ACLs
//!
//! Object backends talk to an [`ObjectClient`] per target and apply gzip
//! transport encoding to compressible content.
//!
//! # Example
//!
//! ```rust
//! use uploadfs_core::StoragePath;
//! use uploadfs_storage::{CopyOptions, LocalConfig, LocalStorage, StorageBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = LocalStorage::init(&LocalConfig::new("/tmp/uploads", "/uploads")).await?;
//! let path = StoragePath::parse("/docs/report.txt")?;
//!
//! storage.copy_in("report.txt".as_ref(), &path, &CopyOptions::default()).await?;
//! assert_eq!(storage.url("/docs/report.txt"), "/uploads/docs/report.txt");
//! storage.destroy().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod backend;
mod client;
mod config;
mod local;
pub mod object;
mod replica;
mod transport;

pub use access::{DISABLED_MARKER, DisabledFileKey, is_disabled_path, path_from_disabled_path};
pub use backend::{CopyOptions, StorageBackend};
pub use client::{
    BackendTarget, FetchedObject, HttpObjectClient, MemoryObject, MemoryObjectClient,
    ObjectClient, PutOptions,
};
pub use config::{StorageConfig, connect};
pub use local::{
    DEFAULT_GC_INTERVAL, DirectoryGc, LocalConfig, LocalStorage, MAX_COPY_ATTEMPTS, copy_file,
};
pub use object::{
    AzureCluster, AzureConfig, AzureStorage, GcsConfig, GcsStorage, S3Config, S3Storage,
};
pub use replica::ReplicaSet;
pub use transport::{
    DEFAULT_NO_GZIP_EXTENSIONS, GZIP_ENCODING, GzipPolicy, decode_body, encode_gzip,
};
pub use uploadfs_error::{StorageError, StorageErrorKind};
