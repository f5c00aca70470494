//! Crash-safe local file copy.

use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uploadfs_error::{StorageError, StorageErrorKind, UploadfsResult};

/// Attempts to create the destination before giving up on a directory race.
pub const MAX_COPY_ATTEMPTS: usize = 100;

/// Stream `source` into `destination`, creating missing parent directories.
///
/// A concurrent GC sweep may remove a freshly created parent directory
/// between `create_dir_all` and the open, so opening is retried up to
/// [`MAX_COPY_ATTEMPTS`] times. On failure the partial destination is
/// removed before the original error is returned.
///
/// # Errors
///
/// `NotFound` when `source` does not exist; the destination is not
/// touched in that case. Any destination failure is reported as `Io`.
pub async fn copy_file(source: &Path, destination: &Path) -> UploadfsResult<u64> {
    let mut input = File::open(source)
        .await
        .map_err(|e| StorageError::from_io(source.display(), &e))?;

    let mut attempts = 0;
    let mut output = loop {
        attempts += 1;
        match File::create(destination).await {
            Ok(file) => break file,
            Err(e) if e.kind() == ErrorKind::NotFound && attempts < MAX_COPY_ATTEMPTS => {
                let Some(parent) = destination.parent() else {
                    return Err(destination_error(destination, &e));
                };
                debug!(parent = %parent.display(), attempts, "Creating missing parent directories");
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    if e.kind() != ErrorKind::NotFound {
                        return Err(destination_error(destination, &e));
                    }
                }
            }
            Err(e) => return Err(destination_error(destination, &e)),
        }
    };

    let copied = async {
        let bytes = tokio::io::copy(&mut input, &mut output).await?;
        output.flush().await?;
        output.sync_all().await?;
        Ok::<_, std::io::Error>(bytes)
    }
    .await;

    match copied {
        Ok(bytes) => {
            debug!(bytes, attempts, destination = %destination.display(), "Copied file");
            Ok(bytes)
        }
        Err(e) => {
            drop(output);
            if let Err(cleanup) = tokio::fs::remove_file(destination).await {
                warn!(destination = %destination.display(), error = %cleanup, "Failed to remove partial copy");
            }
            Err(destination_error(destination, &e))
        }
    }
}

#[track_caller]
fn destination_error(destination: &Path, err: &std::io::Error) -> uploadfs_error::UploadfsError {
    StorageError::new(StorageErrorKind::Io(format!(
        "{}: {}",
        destination.display(),
        err
    )))
    .into()
}
