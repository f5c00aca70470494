//! Pure-library backend built on the `image` crate.
//!
//! Used when ImageMagick is not installed. Decoding, orientation, cropping
//! and scaling all run on the blocking thread pool.

use crate::backend::{ConvertContext, ConvertOutcome, ImageBackend};
use crate::orientation::{apply_orientation, read_orientation};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use uploadfs_core::{CropSpec, ImageInfo, ImageSize, Orientation, fit_within, largest_bound};
use uploadfs_error::{TranscodeError, TranscodeErrorKind, UploadfsResult};

/// JPEG quality for the adjusted original.
pub const ORIGINAL_JPEG_QUALITY: u8 = 92;

/// Backend that needs no external tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateBackend;

impl ImageCrateBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

/// Owned copy of a conversion request for the blocking pool.
struct Job {
    bytes: Vec<u8>,
    extension: String,
    orientation: Orientation,
    crop: Option<CropSpec>,
    sizes: Vec<(ImageSize, PathBuf)>,
    original: Option<PathBuf>,
    jpeg_quality: u8,
}

fn decode_error(e: impl std::fmt::Display) -> TranscodeError {
    TranscodeError::new(TranscodeErrorKind::Decode(e.to_string()))
}

fn encode_error(e: impl std::fmt::Display) -> TranscodeError {
    TranscodeError::new(TranscodeErrorKind::Encode(e.to_string()))
}

fn extension_for(format: ImageFormat) -> Result<&'static str, TranscodeError> {
    match format {
        ImageFormat::Jpeg => Ok("jpeg"),
        ImageFormat::Png => Ok("png"),
        ImageFormat::Gif => Ok("gif"),
        ImageFormat::WebP => Ok("webp"),
        other => Err(TranscodeError::new(TranscodeErrorKind::Unsupported(
            format!("{:?}", other),
        ))),
    }
}

/// Identify an in-memory image by sniffing its contents.
pub fn identify_bytes(bytes: &[u8]) -> Result<ImageInfo, TranscodeError> {
    let format = image::guess_format(bytes).map_err(decode_error)?;
    let name = extension_for(format)?;
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(decode_error)?;
    let orientation = read_orientation(bytes);
    let animated = format == ImageFormat::Gif && gif_frame_count(bytes, 2)? > 1;
    Ok(ImageInfo::from_raw(name, width, height, orientation, animated))
}

fn gif_frame_count(bytes: &[u8], limit: usize) -> Result<usize, TranscodeError> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(decode_error)?;
    Ok(decoder.into_frames().take(limit).count())
}

fn encode(image: &DynamicImage, extension: &str, quality: u8) -> Result<Vec<u8>, TranscodeError> {
    let mut buf = Cursor::new(Vec::new());
    match extension {
        "jpg" => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            image
                .to_rgb8()
                .write_with_encoder(encoder)
                .map_err(encode_error)?;
        }
        "png" => image.write_to(&mut buf, ImageFormat::Png).map_err(encode_error)?,
        "gif" => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut buf, ImageFormat::Gif)
            .map_err(encode_error)?,
        "webp" => {
            // The bundled WebP encoder is lossless only.
            let encoder = WebPEncoder::new_lossless(&mut buf);
            image
                .to_rgba8()
                .write_with_encoder(encoder)
                .map_err(encode_error)?;
        }
        other => {
            return Err(TranscodeError::new(TranscodeErrorKind::Unsupported(
                other.to_string(),
            )));
        }
    }
    Ok(buf.into_inner())
}

fn write_output(path: &Path, data: &[u8]) -> Result<(), TranscodeError> {
    std::fs::write(path, data).map_err(|e| {
        TranscodeError::new(TranscodeErrorKind::Io(format!("{}: {}", path.display(), e)))
    })
}

/// Orient and crop, producing the upright working image.
fn prepare(image: DynamicImage, orientation: Orientation, crop: Option<CropSpec>) -> DynamicImage {
    let upright = apply_orientation(image, orientation);
    match crop {
        Some(c) => upright.crop_imm(c.left, c.top, c.width, c.height),
        None => upright,
    }
}

/// Scale down to fit a box. Images already inside it are returned as is.
fn shrink(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (w, h) = fit_within(image.width(), image.height(), width, height);
    if (w, h) == (image.width(), image.height()) {
        image.clone()
    } else {
        image.resize_exact(w, h, FilterType::Lanczos3)
    }
}

fn convert_still(job: &Job) -> Result<(), TranscodeError> {
    let decoded = image::load_from_memory(&job.bytes).map_err(decode_error)?;
    let working = prepare(decoded, job.orientation, job.crop);

    if let Some(path) = &job.original {
        write_output(path, &encode(&working, &job.extension, ORIGINAL_JPEG_QUALITY)?)?;
    }

    let boxes: Vec<ImageSize> = job.sizes.iter().map(|(s, _)| s.clone()).collect();
    let scaled = match largest_bound(&boxes) {
        Some((width, height)) => shrink(&working, width, height),
        None => return Ok(()),
    };
    for (size, path) in &job.sizes {
        let derivative = shrink(&scaled, size.width, size.height);
        debug!(
            size = %size.name,
            width = derivative.width(),
            height = derivative.height(),
            "Writing derivative"
        );
        write_output(path, &encode(&derivative, &job.extension, job.jpeg_quality)?)?;
    }
    Ok(())
}

fn encode_frames(frames: Vec<Frame>) -> Result<Vec<u8>, TranscodeError> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(Repeat::Infinite).map_err(encode_error)?;
        encoder.encode_frames(frames).map_err(encode_error)?;
    }
    Ok(buf)
}

fn convert_animated(job: &Job) -> Result<(), TranscodeError> {
    let decoder = GifDecoder::new(Cursor::new(job.bytes.as_slice())).map_err(decode_error)?;
    // Frames come out composited onto the full canvas.
    let frames: Vec<(DynamicImage, image::Delay)> = decoder
        .into_frames()
        .collect_frames()
        .map_err(decode_error)?
        .into_iter()
        .map(|frame| {
            let delay = frame.delay();
            let image = DynamicImage::ImageRgba8(frame.into_buffer());
            (prepare(image, job.orientation, job.crop), delay)
        })
        .collect();

    let render = |bound: Option<(u32, u32)>| -> Vec<Frame> {
        frames
            .iter()
            .map(|(image, delay)| {
                let out = match bound {
                    Some((w, h)) => shrink(image, w, h),
                    None => image.clone(),
                };
                Frame::from_parts(out.to_rgba8(), 0, 0, *delay)
            })
            .collect()
    };

    if let Some(path) = &job.original {
        write_output(path, &encode_frames(render(None))?)?;
    }
    for (size, path) in &job.sizes {
        write_output(path, &encode_frames(render(Some((size.width, size.height))))?)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ImageBackend for ImageCrateBackend {
    fn name(&self) -> &'static str {
        "image"
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn identify(&self, path: &Path) -> UploadfsResult<ImageInfo> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TranscodeError::new(TranscodeErrorKind::Io(format!("{}: {}", path.display(), e)))
        })?;
        let info = tokio::task::spawn_blocking(move || identify_bytes(&bytes))
            .await
            .map_err(|e| TranscodeError::new(TranscodeErrorKind::Io(e.to_string())))??;
        debug!(?info, "Identified image");
        Ok(info)
    }

    #[instrument(skip(self, context), fields(source = %context.source.display(), sizes = context.sizes.len()))]
    async fn convert(&self, context: &ConvertContext<'_>) -> UploadfsResult<ConvertOutcome> {
        if let Some(crop) = context.crop {
            crop.validate_within(context.info.width, context.info.height)?;
        }
        let bytes = tokio::fs::read(context.source).await.map_err(|e| {
            TranscodeError::new(TranscodeErrorKind::Io(format!(
                "{}: {}",
                context.source.display(),
                e
            )))
        })?;

        let outcome = ConvertOutcome {
            derivatives: context
                .sizes
                .iter()
                .map(|size| (size.clone(), context.size_path(size)))
                .collect(),
            adjusted_original: context.copy_original.then(|| context.original_path()),
        };
        let job = Job {
            bytes,
            extension: context.extension.to_string(),
            orientation: context.info.orientation,
            crop: context.crop,
            sizes: outcome.derivatives.clone(),
            original: outcome.adjusted_original.clone(),
            jpeg_quality: context.jpeg_quality,
        };
        let animated = context.info.animated;

        tokio::task::spawn_blocking(move || {
            if animated {
                convert_animated(&job)
            } else {
                convert_still(&job)
            }
        })
        .await
        .map_err(|e| TranscodeError::new(TranscodeErrorKind::Io(e.to_string())))??;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_identify_png_bytes() {
        let info = identify_bytes(&png(30, 20)).unwrap();
        assert_eq!(info.extension, "png");
        assert_eq!((info.width, info.height), (30, 20));
        assert!(!info.animated);
    }

    #[test]
    fn test_identify_rejects_unknown_bytes() {
        assert!(identify_bytes(b"plain text").is_err());
    }

    #[test]
    fn test_shrink_never_upscales() {
        let image = DynamicImage::new_rgb8(40, 10);
        let out = shrink(&image, 400, 400);
        assert_eq!((out.width(), out.height()), (40, 10));
        let out = shrink(&image, 20, 20);
        assert_eq!((out.width(), out.height()), (20, 5));
    }

    #[test]
    fn test_encode_jpeg_magic() {
        let data = encode(&DynamicImage::new_rgb8(8, 8), "jpg", 80).unwrap();
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);
    }
}
