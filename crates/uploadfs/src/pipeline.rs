//! Derivative pipeline: identify, transcode once, upload every rendition.

use crate::workspace::TempWorkspace;
use futures::future::join_all;
use std::path::Path;
use tracing::{debug, info, instrument};
use uploadfs_core::{CopyImageResult, CropSpec, ImageInfo, ImageSize, StoragePath, split_extension};
use uploadfs_error::UploadfsResult;
use uploadfs_image::{ConvertContext, ImageBackend};
use uploadfs_storage::{CopyOptions, StorageBackend};

/// Per-call overrides for `copy_image_in`.
///
/// Unset fields fall back to the instance configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyImageOptions {
    /// Crop applied before any scaling. The uncropped original is not stored.
    pub crop: Option<CropSpec>,
    /// JPEG quality for scaled derivatives
    pub scaled_jpeg_quality: Option<u8>,
    /// Store the original alongside the derivatives
    pub copy_original: Option<bool>,
    /// Rotate the stored original upright
    pub orient_originals: Option<bool>,
}

impl CopyImageOptions {
    /// Crop before scaling.
    pub fn with_crop(mut self, crop: CropSpec) -> Self {
        self.crop = Some(crop);
        self
    }

    /// Override the scaled JPEG quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.scaled_jpeg_quality = Some(quality);
        self
    }

    /// Store (or skip) the original.
    pub fn with_copy_original(mut self, copy: bool) -> Self {
        self.copy_original = Some(copy);
        self
    }

    /// Orient (or keep as uploaded) the stored original.
    pub fn with_orient_originals(mut self, orient: bool) -> Self {
        self.orient_originals = Some(orient);
        self
    }
}

/// One configured pipeline, borrowed from its `Uploadfs` instance.
#[derive(Clone, Copy)]
pub struct DerivativePipeline<'a> {
    /// Destination of every rendition
    pub storage: &'a dyn StorageBackend,
    /// Identifies and transcodes
    pub images: &'a dyn ImageBackend,
    /// Derivatives to produce
    pub sizes: &'a [ImageSize],
    /// Parent of each run's workspace
    pub temp_path: &'a Path,
    /// Default for `CopyImageOptions::copy_original`
    pub copy_original: bool,
    /// Default for `CopyImageOptions::orient_originals`
    pub orient_originals: bool,
    /// Default for `CopyImageOptions::scaled_jpeg_quality`
    pub jpeg_quality: u8,
}

impl std::fmt::Debug for DerivativePipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivativePipeline")
            .field("storage", &self.storage.name())
            .field("images", &self.images.name())
            .field("sizes", &self.sizes)
            .field("temp_path", &self.temp_path)
            .finish()
    }
}

impl DerivativePipeline<'_> {
    /// Store `local` at `path` together with one derivative per size.
    ///
    /// Derivatives land at `{base}.{size}.{ext}` where `base` is `path`
    /// without its extension and `ext` is the true format. The original
    /// lands at `path` when it carries an extension, `{path}.{ext}`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Identification, transcode and upload failures abort the run.
    /// Renditions uploaded before the failure stay in storage.
    #[instrument(skip(self, local, options), fields(local = %local.display(), images = self.images.name()))]
    pub async fn run(
        &self,
        local: &Path,
        path: &str,
        options: &CopyImageOptions,
    ) -> UploadfsResult<CopyImageResult> {
        let copy_original = options.copy_original.unwrap_or(self.copy_original);
        let orient = options.orient_originals.unwrap_or(self.orient_originals);
        let jpeg_quality = options.scaled_jpeg_quality.unwrap_or(self.jpeg_quality);

        let identified = self.images.identify(local).await?;
        if let Some(crop) = options.crop {
            crop.validate_within(identified.width, identified.height)?;
        }

        let (base_path, explicit_extension) = split_extension(path);
        let original_path = match explicit_extension {
            Some(_) => StoragePath::parse(path)?,
            None => StoragePath::parse(&format!("{}.{}", path, identified.extension))?,
        };

        // Nothing to adjust, so the upload is the original.
        let mut original_done = false;
        if copy_original && !orient && options.crop.is_none() {
            self.storage
                .copy_in(local, &original_path, &CopyOptions::default())
                .await?;
            original_done = true;
        }
        let wants_adjusted = copy_original && !original_done;

        if self.sizes.is_empty() && !wants_adjusted {
            debug!("No derivatives configured, skipping transcode");
            return Ok(result(base_path, &identified));
        }

        let workspace = TempWorkspace::create(Some(self.temp_path)).await?;
        let context = ConvertContext {
            source: local,
            extension: &identified.extension,
            info: &identified,
            sizes: self.sizes,
            crop: options.crop,
            workspace: workspace.path(),
            copy_original: wants_adjusted,
            jpeg_quality,
        };
        let outcome = self.images.convert(&context).await?;

        let mut info = identified.clone();
        if let Some(adjusted) = &outcome.adjusted_original {
            let reidentified = self.images.identify(adjusted).await?;
            info = ImageInfo {
                extension: identified.extension.clone(),
                original_width: identified.original_width,
                original_height: identified.original_height,
                ..reidentified
            };
        }

        let uploads = outcome.derivatives.iter().map(|(size, file)| {
            let target = format!("{}.{}", base_path, size.file_suffix(&info.extension));
            async move {
                let target = StoragePath::parse(&target)?;
                self.storage
                    .copy_in(file, &target, &CopyOptions::default())
                    .await
            }
        });
        join_all(uploads)
            .await
            .into_iter()
            .collect::<UploadfsResult<Vec<()>>>()?;

        if let Some(adjusted) = &outcome.adjusted_original {
            self.storage
                .copy_in(adjusted, &original_path, &CopyOptions::default())
                .await?;
        }

        info!(
            derivatives = outcome.derivatives.len(),
            original = copy_original,
            "Stored image"
        );
        Ok(result(base_path, &info))
    }
}

fn result(base_path: &str, info: &ImageInfo) -> CopyImageResult {
    CopyImageResult {
        base_path: base_path.to_string(),
        extension: info.extension.clone(),
        width: info.width,
        height: info.height,
        original_width: info.original_width,
        original_height: info.original_height,
    }
}
