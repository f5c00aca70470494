//! Object-store backends.
//!
//! S3, GCS and Azure share one upload/download path: read the local file,
//! gzip it when the policy allows, fan the body out to every replica, and
//! decode on the way back according to the stored content encoding. They
//! differ only in how they build URLs and how they hide disabled objects.

mod azure;
mod gcs;
mod s3;

pub use azure::{AzureCluster, AzureConfig, AzureStorage};
pub use gcs::{GcsConfig, GcsStorage};
pub use s3::{S3Config, S3Storage};

use crate::backend::CopyOptions;
use crate::client::{HttpObjectClient, ObjectClient, PutOptions};
use crate::replica::ReplicaSet;
use crate::transport::{GZIP_ENCODING, GzipPolicy, decode_body, encode_gzip};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use uploadfs_core::{StoragePath, content_type_for};
use uploadfs_error::{StorageError, StorageErrorKind, UploadfsResult};

/// Upload and download plumbing shared by the object backends.
#[derive(Debug, Clone)]
pub(crate) struct ObjectCore {
    replicas: ReplicaSet,
    gzip: GzipPolicy,
    cache_control: Option<String>,
}

impl ObjectCore {
    pub(crate) fn new(
        replicas: ReplicaSet,
        gzip: GzipPolicy,
        cache_control: Option<String>,
    ) -> Self {
        Self {
            replicas,
            gzip,
            cache_control,
        }
    }

    pub(crate) fn replicas(&self) -> &ReplicaSet {
        &self.replicas
    }

    pub(crate) async fn upload(
        &self,
        local: &Path,
        path: &StoragePath,
        options: &CopyOptions,
        acl: Option<&str>,
    ) -> UploadfsResult<()> {
        let body = tokio::fs::read(local)
            .await
            .map_err(|e| StorageError::from_io(local.display(), &e))?;
        let content_type = options
            .content_type
            .clone()
            .unwrap_or_else(|| content_type_for(path.as_key()));
        let gzip = options.gzip.unwrap_or_else(|| self.gzip.should_gzip(path));
        let size = body.len();
        let body = if gzip { encode_gzip(body).await? } else { body };
        debug!(path = %path, size, encoded = body.len(), gzip, "Uploading object");

        let put = PutOptions {
            content_type,
            content_encoding: gzip.then(|| GZIP_ENCODING.to_string()),
            cache_control: self.cache_control.clone(),
            acl: acl.map(str::to_string),
        };
        self.replicas.put(path.as_key(), body, &put).await
    }

    pub(crate) async fn download(&self, path: &StoragePath, local: &Path) -> UploadfsResult<()> {
        let fetched = self.replicas.get(path.as_key()).await?;
        let body = decode_body(fetched.body, fetched.content_encoding.as_deref()).await?;
        let io_error = |e: std::io::Error| {
            StorageError::new(StorageErrorKind::Io(format!("{}: {}", local.display(), e)))
        };
        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        if let Err(e) = tokio::fs::write(local, &body).await {
            // Best effort, the write error is reported.
            let _ = tokio::fs::remove_file(local).await;
            return Err(io_error(e).into());
        }
        debug!(path = %path, size = body.len(), "Downloaded object");
        Ok(())
    }
}

/// Normalize an endpoint to `scheme://host[:port]`.
///
/// Endpoints that already carry a scheme are used as given. Otherwise the
/// scheme is `https` unless `secure` is false or a port other than 443 is
/// given without `secure`, and default ports are left out.
///
/// # Examples
///
/// ```
/// use uploadfs_storage::object::infer_endpoint;
///
/// assert_eq!(infer_endpoint("s3.example.com", None, None), "https://s3.example.com");
/// assert_eq!(infer_endpoint("localhost", None, Some(9000)), "http://localhost:9000");
/// assert_eq!(infer_endpoint("localhost", Some(true), Some(9000)), "https://localhost:9000");
/// assert_eq!(infer_endpoint("http://minio:9000", None, None), "http://minio:9000");
/// ```
pub fn infer_endpoint(endpoint: &str, secure: Option<bool>, port: Option<u16>) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.trim_end_matches('/').to_string();
    }
    let default_secure = port.is_none_or(|p| p == 443);
    let secure = secure.unwrap_or(false) || default_secure;
    let port = port.unwrap_or(443);
    let scheme = if secure { "https://" } else { "http://" };
    let port = match (secure, port) {
        (true, 443) | (false, 80) => String::new(),
        (_, port) => format!(":{}", port),
    };
    format!("{}{}{}", scheme, endpoint.trim_end_matches('/'), port)
}

/// Strip the scheme from an endpoint.
pub(crate) fn strip_scheme(endpoint: &str) -> &str {
    endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint)
}

/// `public, max-age=N` for a configured caching time.
pub(crate) fn caching_header(caching_time: Option<u64>) -> Option<String> {
    caching_time.map(|secs| format!("public, max-age={}", secs))
}

/// Build an HTTP client with optional credentials.
pub(crate) fn http_client(
    target: crate::client::BackendTarget,
    endpoint: impl Into<String>,
    bearer_token: Option<&str>,
    query_credential: Option<&str>,
) -> Arc<dyn ObjectClient> {
    let mut client = HttpObjectClient::new(target, endpoint);
    if let Some(token) = bearer_token {
        client = client.with_bearer_token(token);
    }
    if let Some(query) = query_credential {
        client = client.with_query(query);
    }
    Arc::new(client)
}
