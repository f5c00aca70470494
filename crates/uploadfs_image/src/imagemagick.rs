//! ImageMagick command-line backend.
//!
//! Still images are converted in a single `convert` run: the source is
//! loaded once, oriented, optionally cropped and written as the adjusted
//! original, scaled once to the largest box any size needs, and then each
//! size is cloned from that intermediate and written out. No lossy
//! intermediate file is ever produced. Animated GIFs are coalesced and
//! converted with one run per output, which behaves better on large
//! filmstrips than a single pipeline.

use crate::backend::{ConvertContext, ConvertOutcome, ImageBackend};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use tokio::process::Command;
use tracing::{debug, instrument};
use uploadfs_core::{ImageInfo, Orientation, largest_bound};
use uploadfs_error::{TranscodeError, TranscodeErrorKind, UploadfsResult};

/// Format string passed to `identify`, one line per frame.
pub const IDENTIFY_FORMAT: &str = "%m %w %h %[orientation]\n";

const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "png", "gif", "webp"];

/// Backend driving the `identify` and `convert` executables.
#[derive(Debug, Clone)]
pub struct ImageMagickBackend {
    identify: String,
    convert: String,
}

impl Default for ImageMagickBackend {
    fn default() -> Self {
        Self {
            identify: "identify".to_string(),
            convert: "convert".to_string(),
        }
    }
}

impl ImageMagickBackend {
    /// Use the tools found on `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use specific executables.
    pub fn with_binaries(identify: impl Into<String>, convert: impl Into<String>) -> Self {
        Self {
            identify: identify.into(),
            convert: convert.into(),
        }
    }
}

/// Parse `identify -format IDENTIFY_FORMAT` output.
///
/// # Errors
///
/// `MalformedOutput` when the first line cannot be read, `Unsupported`
/// for formats other than JPEG, PNG, GIF and WebP.
///
/// # Examples
///
/// ```
/// use uploadfs_image::parse_identify_output;
///
/// let info = parse_identify_output("JPEG 2592 1936 RightTop\n").unwrap();
/// assert_eq!(info.extension, "jpg");
/// assert_eq!((info.width, info.height), (1936, 2592));
/// ```
pub fn parse_identify_output(output: &str) -> Result<ImageInfo, TranscodeError> {
    let frames: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let first = frames.first().ok_or_else(|| {
        TranscodeError::new(TranscodeErrorKind::MalformedOutput(
            "identify printed nothing".to_string(),
        ))
    })?;

    let mut fields = first.split_whitespace();
    let malformed = || {
        TranscodeError::new(TranscodeErrorKind::MalformedOutput(format!(
            "unexpected identify line {:?}",
            first
        )))
    };
    let format = fields.next().ok_or_else(malformed)?;
    let width: u32 = fields
        .next()
        .and_then(|w| w.parse().ok())
        .ok_or_else(malformed)?;
    let height: u32 = fields
        .next()
        .and_then(|h| h.parse().ok())
        .ok_or_else(malformed)?;
    let orientation = fields
        .next()
        .and_then(|o| Orientation::from_str(o).ok())
        .unwrap_or_default();

    let info = ImageInfo::from_raw(format, width, height, orientation, false);
    if !SUPPORTED_EXTENSIONS.contains(&info.extension.as_str()) {
        return Err(TranscodeError::new(TranscodeErrorKind::Unsupported(
            format.to_string(),
        )));
    }
    let animated = info.extension == "gif" && frames.len() > 1;
    Ok(ImageInfo { animated, ..info })
}

fn resize_geometry(width: u32, height: u32) -> String {
    format!("{}x{}>", width, height)
}

fn push(args: &mut Vec<OsString>, values: &[&str]) {
    args.extend(values.iter().map(OsString::from));
}

/// Arguments for the single-pass conversion of a still image.
pub fn standard_convert_args(context: &ConvertContext<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![context.source.into()];
    push(&mut args, &["-auto-orient"]);
    if let Some(crop) = context.crop {
        push(&mut args, &["-crop", &crop.geometry(), "+repage"]);
    }
    if context.is_jpeg() {
        push(&mut args, &["-colorspace", "sRGB"]);
    }
    if context.copy_original {
        push(&mut args, &["(", "-clone", "0--1", "-write"]);
        args.push(context.original_path().into());
        push(&mut args, &["+delete", ")"]);
    }
    push(&mut args, &["-strip"]);
    if let Some((width, height)) = largest_bound(context.sizes) {
        push(&mut args, &["-resize", &resize_geometry(width, height)]);
    }
    let quality = context.jpeg_quality.to_string();
    for size in context.sizes {
        push(
            &mut args,
            &["(", "-clone", "0--1", "-resize", &resize_geometry(size.width, size.height)],
        );
        if context.is_jpeg() {
            push(&mut args, &["-quality", &quality]);
        }
        push(&mut args, &["-write"]);
        args.push(context.size_path(size).into());
        push(&mut args, &["+delete", ")"]);
    }
    push(&mut args, &["null:"]);
    args
}

/// One argument list per output for an animated GIF.
pub fn animated_convert_args(context: &ConvertContext<'_>) -> Vec<Vec<OsString>> {
    let mut base: Vec<OsString> = vec![context.source.into()];
    push(&mut base, &["-coalesce", "-auto-orient"]);
    if let Some(crop) = context.crop {
        push(&mut base, &["-crop", &crop.geometry(), "+repage"]);
    }

    let mut commands = Vec::with_capacity(context.sizes.len() + 1);
    if context.copy_original {
        let mut args = base.clone();
        push(&mut args, &["-layers", "Optimize"]);
        args.push(context.original_path().into());
        commands.push(args);
    }
    for size in context.sizes {
        let mut args = base.clone();
        push(
            &mut args,
            &["-resize", &resize_geometry(size.width, size.height), "-layers", "Optimize"],
        );
        args.push(context.size_path(size).into());
        commands.push(args);
    }
    commands
}

/// Run a tool to completion, returning its standard output.
async fn run(tool: &str, args: &[OsString]) -> Result<String, TranscodeError> {
    debug!(tool, args = args.len(), "Running image tool");
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            TranscodeError::new(TranscodeErrorKind::Spawn {
                tool: tool.to_string(),
                reason: e.to_string(),
            })
        })?;
    if !output.status.success() {
        return Err(TranscodeError::new(TranscodeErrorKind::Failed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait::async_trait]
impl ImageBackend for ImageMagickBackend {
    fn name(&self) -> &'static str {
        "imagemagick"
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn identify(&self, path: &Path) -> UploadfsResult<ImageInfo> {
        let args = [OsString::from("-format"), IDENTIFY_FORMAT.into(), path.into()];
        let stdout = run(&self.identify, &args).await?;
        let info = parse_identify_output(&stdout)?;
        debug!(?info, "Identified image");
        Ok(info)
    }

    #[instrument(skip(self, context), fields(source = %context.source.display(), sizes = context.sizes.len()))]
    async fn convert(&self, context: &ConvertContext<'_>) -> UploadfsResult<ConvertOutcome> {
        if let Some(crop) = context.crop {
            crop.validate_within(context.info.width, context.info.height)?;
        }
        if context.info.animated {
            for args in animated_convert_args(context) {
                run(&self.convert, &args).await?;
            }
        } else {
            run(&self.convert, &standard_convert_args(context)).await?;
        }

        Ok(ConvertOutcome {
            derivatives: context
                .sizes
                .iter()
                .map(|size| (size.clone(), context.size_path(size)))
                .collect(),
            adjusted_original: context.copy_original.then(|| context.original_path()),
        })
    }
}
