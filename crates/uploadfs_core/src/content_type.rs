//! Content type lookup for upload metadata.

/// Content type for an object path, guessed from its extension.
///
/// Unknown or missing extensions map to `application/octet-stream`.
///
/// ```
/// use uploadfs_core::content_type_for;
///
/// assert_eq!(content_type_for("/docs/report.pdf"), "application/pdf");
/// ```
pub fn content_type_for(path: &str) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
