//! Image identification and derivative generation for uploadfs.
//!
//! Two interchangeable backends implement [`ImageBackend`]:
//!
//! - [`ImageMagickBackend`] drives the `identify` and `convert` tools
//! - [`ImageCrateBackend`] uses the pure-Rust `image` crate
//!
//! [`select_backend`] picks one from configuration, falling back to
//! ImageMagick when `identify` is on `PATH` and the library otherwise.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use uploadfs_image::{ImageBackendKind, select_backend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = select_backend(Some(ImageBackendKind::Image));
//! let info = backend.identify(Path::new("photo.jpg")).await?;
//! println!("{}x{} {}", info.width, info.height, info.extension);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod imagemagick;
mod library;
mod orientation;

pub use backend::{ADJUSTED_ORIGINAL_STEM, ConvertContext, ConvertOutcome, ImageBackend};
pub use imagemagick::{
    IDENTIFY_FORMAT, ImageMagickBackend, animated_convert_args, parse_identify_output,
    standard_convert_args,
};
pub use library::{ImageCrateBackend, ORIGINAL_JPEG_QUALITY, identify_bytes};
pub use orientation::{apply_orientation, read_orientation};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Which image backend to use.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageBackendKind {
    /// ImageMagick command-line tools
    ImageMagick,
    /// The pure-Rust `image` crate
    Image,
}

/// Locate an executable on `PATH`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Build the configured backend, or detect one when unset.
pub fn select_backend(kind: Option<ImageBackendKind>) -> Arc<dyn ImageBackend> {
    let kind = kind.unwrap_or_else(|| {
        if find_on_path("identify").is_some() {
            ImageBackendKind::ImageMagick
        } else {
            ImageBackendKind::Image
        }
    });
    info!(backend = %kind, "Selected image backend");
    match kind {
        ImageBackendKind::ImageMagick => Arc::new(ImageMagickBackend::new()),
        ImageBackendKind::Image => Arc::new(ImageCrateBackend::new()),
    }
}
