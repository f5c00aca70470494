//! Image metadata and derivative specifications.

use serde::{Deserialize, Serialize};
use uploadfs_error::{ConfigError, TranscodeError, TranscodeErrorKind};

/// A named derivative box.
///
/// Derivatives are never wider than `width` nor taller than `height`,
/// always keep the source aspect ratio and are never scaled up.
///
/// # Examples
///
/// ```
/// use uploadfs_core::ImageSize;
///
/// let small = ImageSize::new("small", 320, 320);
/// assert_eq!(small.file_suffix("jpg"), "small.jpg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Name used in the derivative path (`{base}.{name}.{ext}`)
    pub name: String,
    /// Maximum width in pixels
    pub width: u32,
    /// Maximum height in pixels
    pub height: u32,
}

impl ImageSize {
    /// Create a new size.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    /// File name suffix for this size.
    pub fn file_suffix(&self, extension: &str) -> String {
        format!("{}.{}", self.name, extension)
    }

    /// Reject empty names, names that would escape the base path, and zero boxes.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() || self.name.contains('/') || self.name.contains('.') {
            return Err(ConfigError::new(format!(
                "image size name must be a non-empty single word, got {:?}",
                self.name
            ))
            .for_setting("image_sizes"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::new(format!(
                "image size {} must have non-zero width and height",
                self.name
            ))
            .for_setting("image_sizes"));
        }
        Ok(())
    }
}

/// Crop rectangle in source pixels, applied before any scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropSpec {
    /// Left edge
    pub left: u32,
    /// Top edge
    pub top: u32,
    /// Width of the crop
    pub width: u32,
    /// Height of the crop
    pub height: u32,
}

impl CropSpec {
    /// Check the rectangle is non-empty and lies within `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns `TranscodeErrorKind::InvalidCrop` otherwise.
    #[track_caller]
    pub fn validate_within(&self, width: u32, height: u32) -> Result<(), TranscodeError> {
        let fits = self.width > 0
            && self.height > 0
            && u64::from(self.left) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.top) + u64::from(self.height) <= u64::from(height);
        if fits {
            Ok(())
        } else {
            Err(TranscodeError::new(TranscodeErrorKind::InvalidCrop(format!(
                "{}x{}+{}+{} outside {}x{}",
                self.width, self.height, self.left, self.top, width, height
            ))))
        }
    }

    /// ImageMagick geometry (`WxH+L+T`).
    pub fn geometry(&self) -> String {
        format!("{}x{}+{}+{}", self.width, self.height, self.left, self.top)
    }
}

/// Orientation hint as reported by ImageMagick.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
pub enum Orientation {
    /// No hint present
    #[default]
    Undefined,
    /// EXIF 1
    TopLeft,
    /// EXIF 2
    TopRight,
    /// EXIF 3
    BottomRight,
    /// EXIF 4
    BottomLeft,
    /// EXIF 5
    LeftTop,
    /// EXIF 6
    RightTop,
    /// EXIF 7
    RightBottom,
    /// EXIF 8
    LeftBottom,
}

impl Orientation {
    /// Map an EXIF orientation tag value.
    pub fn from_exif(value: u32) -> Self {
        match value {
            1 => Self::TopLeft,
            2 => Self::TopRight,
            3 => Self::BottomRight,
            4 => Self::BottomLeft,
            5 => Self::LeftTop,
            6 => Self::RightTop,
            7 => Self::RightBottom,
            8 => Self::LeftBottom,
            _ => Self::Undefined,
        }
    }

    /// Whether displaying the image requires a 90 or 270 degree rotation.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::LeftTop | Self::RightTop | Self::RightBottom | Self::LeftBottom
        )
    }
}

/// Result of identifying a local image.
///
/// `width` and `height` describe the image as it displays once its
/// orientation hint is applied. `original_width` and `original_height` are
/// the raw encoded dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// True format as a file extension (`jpg`, `png`, `gif`, `webp`)
    pub extension: String,
    /// Display width
    pub width: u32,
    /// Display height
    pub height: u32,
    /// Orientation hint
    pub orientation: Orientation,
    /// Raw encoded width
    pub original_width: u32,
    /// Raw encoded height
    pub original_height: u32,
    /// More than one frame
    pub animated: bool,
}

impl ImageInfo {
    /// Build from raw encoded dimensions, applying the orientation swap.
    ///
    /// # Examples
    ///
    /// ```
    /// use uploadfs_core::{ImageInfo, Orientation};
    ///
    /// let info = ImageInfo::from_raw("jpeg", 2592, 1936, Orientation::RightTop, false);
    /// assert_eq!(info.extension, "jpg");
    /// assert_eq!((info.width, info.height), (1936, 2592));
    /// assert_eq!((info.original_width, info.original_height), (2592, 1936));
    /// ```
    pub fn from_raw(
        format: &str,
        raw_width: u32,
        raw_height: u32,
        orientation: Orientation,
        animated: bool,
    ) -> Self {
        let (width, height) = if orientation.swaps_axes() {
            (raw_height, raw_width)
        } else {
            (raw_width, raw_height)
        };
        let mut extension = format.to_ascii_lowercase();
        if extension == "jpeg" {
            extension = "jpg".to_string();
        }
        Self {
            extension,
            width,
            height,
            orientation,
            original_width: raw_width,
            original_height: raw_height,
            animated,
        }
    }
}

/// What `copy_image_in` reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyImageResult {
    /// Target path with any extension removed
    pub base_path: String,
    /// True extension detected by identify
    pub extension: String,
    /// Display width of the stored original
    pub width: u32,
    /// Display height of the stored original
    pub height: u32,
    /// Raw width of the uploaded source
    pub original_width: u32,
    /// Raw height of the uploaded source
    pub original_height: u32,
}
