//! Gzip transport encoding for object-store uploads.
//!
//! Compressible content is gzip-encoded before upload and stored with a
//! `gzip` content encoding. Downloads consult the stored encoding and
//! decode transparently, so callers always see the original bytes.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::HashSet;
use std::io::{Read, Write};
use uploadfs_core::StoragePath;
use uploadfs_error::{StorageError, StorageErrorKind, UploadfsResult};

/// Content encoding recorded for gzip bodies.
pub const GZIP_ENCODING: &str = "gzip";

/// Extensions of already-compressed formats that are uploaded as-is.
pub const DEFAULT_NO_GZIP_EXTENSIONS: &[&str] = &[
    "gif", "jpg", "jpeg", "png", "webp", "avif", "heic", "mp4", "mpeg", "mpg", "mov", "webm",
    "mp3", "m4a", "ogg", "zip", "gz", "tgz", "bz2", "xz", "7z", "rar",
];

/// Decides which uploads are gzip-encoded in transit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipPolicy {
    no_gzip: HashSet<String>,
}

impl Default for GzipPolicy {
    fn default() -> Self {
        Self::new(None, &[])
    }
}

impl GzipPolicy {
    /// Build a policy.
    ///
    /// `replace` substitutes the default blacklist entirely; `add` extends
    /// whichever blacklist is in effect. Extensions are case-insensitive.
    pub fn new(replace: Option<&[String]>, add: &[String]) -> Self {
        let base: Vec<String> = match replace {
            Some(list) => list.to_vec(),
            None => DEFAULT_NO_GZIP_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        let no_gzip = base
            .into_iter()
            .chain(add.iter().cloned())
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { no_gzip }
    }

    /// Whether `path` should be gzip-encoded on upload.
    pub fn should_gzip(&self, path: &StoragePath) -> bool {
        match path.extension() {
            Some(ext) => !self.no_gzip.contains(&ext.to_ascii_lowercase()),
            None => true,
        }
    }
}

/// Gzip `body` off the async executor.
pub async fn encode_gzip(body: Vec<u8>) -> UploadfsResult<Vec<u8>> {
    let encoded = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::best());
        encoder.write_all(&body)?;
        encoder.finish()
    })
    .await
    .map_err(|e| StorageError::new(StorageErrorKind::Io(format!("gzip task failed: {}", e))))?
    .map_err(|e| StorageError::new(StorageErrorKind::Io(format!("gzip failed: {}", e))))?;
    Ok(encoded)
}

/// Undo the transport encoding named by `encoding`.
///
/// # Errors
///
/// `StorageErrorKind::Unsupported` for encodings other than identity and
/// gzip; `StorageErrorKind::Io` for corrupt gzip data.
pub async fn decode_body(body: Vec<u8>, encoding: Option<&str>) -> UploadfsResult<Vec<u8>> {
    match encoding.map(str::trim) {
        None | Some("") | Some("identity") => Ok(body),
        Some(enc) if enc.eq_ignore_ascii_case(GZIP_ENCODING) => {
            let decoded = tokio::task::spawn_blocking(move || {
                let mut decoded = Vec::with_capacity(body.len() * 2);
                GzDecoder::new(body.as_slice()).read_to_end(&mut decoded)?;
                Ok::<_, std::io::Error>(decoded)
            })
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::Io(format!("gunzip task failed: {}", e)))
            })?
            .map_err(|e| StorageError::new(StorageErrorKind::Io(format!("gunzip failed: {}", e))))?;
            Ok(decoded)
        }
        Some(other) => Err(StorageError::new(StorageErrorKind::Unsupported(format!(
            "content encoding {}",
            other
        )))
        .into()),
    }
}
