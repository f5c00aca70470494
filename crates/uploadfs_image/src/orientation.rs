//! EXIF orientation handling for the pure-library backend.

use image::DynamicImage;
use std::io::Cursor;
use uploadfs_core::Orientation;

/// Rotate and flip pixels so the image displays upright with no hint.
pub fn apply_orientation(image: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Undefined | Orientation::TopLeft => image,
        Orientation::TopRight => image.fliph(),
        Orientation::BottomRight => image.rotate180(),
        Orientation::BottomLeft => image.flipv(),
        Orientation::LeftTop => image.rotate90().fliph(),
        Orientation::RightTop => image.rotate90(),
        Orientation::RightBottom => image.rotate270().fliph(),
        Orientation::LeftBottom => image.rotate270(),
    }
}

/// Read the EXIF orientation tag, `Undefined` when absent or unreadable.
pub fn read_orientation(data: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(data);
    exif::Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from_exif)
        .unwrap_or_default()
}
