//! Core data types for the uploadfs storage library.
//!
//! This crate provides the data model shared by the storage backends, the
//! image backends and the derivative pipeline: canonical storage paths,
//! derivative and crop specifications, identified image metadata, and the
//! box-fit rule every derivative obeys.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod content_type;
mod dimensions;
mod image;
mod path;

pub use content_type::content_type_for;
pub use dimensions::{fit_within, largest_bound};
pub use image::{CopyImageResult, CropSpec, ImageInfo, ImageSize, Orientation};
pub use path::{StoragePath, join_url, split_extension};
