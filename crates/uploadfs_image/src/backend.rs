//! Image backend trait definition.

use std::path::{Path, PathBuf};
use uploadfs_core::{CropSpec, ImageInfo, ImageSize};
use uploadfs_error::UploadfsResult;

/// File name stem of the adjusted original inside the workspace.
///
/// Size names cannot contain `.`, so no derivative can land on this name.
pub const ADJUSTED_ORIGINAL_STEM: &str = "adjusted.original";

/// Everything one conversion needs.
#[derive(Debug, Clone)]
pub struct ConvertContext<'a> {
    /// Source image on local disk
    pub source: &'a Path,
    /// Output extension, the true format reported by `identify`
    pub extension: &'a str,
    /// Result of identifying `source`
    pub info: &'a ImageInfo,
    /// Derivatives to produce
    pub sizes: &'a [ImageSize],
    /// Crop applied before scaling
    pub crop: Option<CropSpec>,
    /// Directory outputs are written to
    pub workspace: &'a Path,
    /// Also write an oriented (and cropped) copy of the source
    pub copy_original: bool,
    /// JPEG quality for scaled derivatives
    pub jpeg_quality: u8,
}

impl ConvertContext<'_> {
    /// Where the derivative for `size` is written.
    pub fn size_path(&self, size: &ImageSize) -> PathBuf {
        self.workspace.join(size.file_suffix(self.extension))
    }

    /// Where the adjusted original is written.
    pub fn original_path(&self) -> PathBuf {
        self.workspace
            .join(format!("{}.{}", ADJUSTED_ORIGINAL_STEM, self.extension))
    }

    /// Whether the output format is JPEG.
    pub fn is_jpeg(&self) -> bool {
        self.extension == "jpg"
    }
}

/// What a conversion produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOutcome {
    /// Derivative files, in the order of the requested sizes
    pub derivatives: Vec<(ImageSize, PathBuf)>,
    /// The adjusted original, when one was requested
    pub adjusted_original: Option<PathBuf>,
}

/// Trait for pluggable image tools.
///
/// Pixel algorithms are the backend's business. Callers rely only on the
/// naming of outputs inside the workspace and on every derivative fitting
/// its box without upscaling.
#[async_trait::async_trait]
pub trait ImageBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Identify a local image from its contents, not its file name.
    async fn identify(&self, path: &Path) -> UploadfsResult<ImageInfo>;

    /// Produce every derivative (and the adjusted original if requested).
    async fn convert(&self, context: &ConvertContext<'_>) -> UploadfsResult<ConvertOutcome>;

    /// Release resources. Both bundled backends hold none.
    async fn destroy(&self) -> UploadfsResult<()> {
        Ok(())
    }
}
