//! Plain HTTP object client.

use super::{BackendTarget, FetchedObject, ObjectClient, PutOptions};
use reqwest::header::{CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, error, instrument};
use uploadfs_core::join_url;
use uploadfs_error::{StorageError, StorageErrorKind, UploadfsResult};

const ACL_HEADER: &str = "x-amz-acl";

/// Object client speaking bare PUT/GET/HEAD/DELETE against `{endpoint}/{key}`.
///
/// Works with any store exposing a path-style REST surface: S3-compatible
/// gateways with presigned query credentials, Azure containers with a SAS
/// token, or a plain WebDAV-ish server behind a bearer token.
#[derive(Debug, Clone)]
pub struct HttpObjectClient {
    client: Client,
    target: BackendTarget,
    endpoint: String,
    bearer_token: Option<String>,
    query: Option<String>,
}

impl HttpObjectClient {
    /// Create a client for the container reachable at `endpoint`.
    pub fn new(target: BackendTarget, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        debug!(replica = %target, endpoint = %endpoint, "Creating HTTP object client");
        Self {
            client: Client::new(),
            target,
            endpoint,
            bearer_token: None,
            query: None,
        }
    }

    /// Send `Authorization: Bearer {token}` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Append a pre-signed query string (SAS token) to every request.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into().trim_start_matches('?').to_string());
        self
    }

    fn url(&self, key: &str, sub_resource: Option<&str>) -> String {
        let base = join_url(&self.endpoint, key);
        let params: Vec<&str> = sub_resource
            .into_iter()
            .chain(self.query.as_deref())
            .collect();
        if params.is_empty() {
            base
        } else {
            format!("{}?{}", base, params.join("&"))
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, key: &str) -> UploadfsResult<Response> {
        let response = self.authorize(request).send().await.map_err(|e| {
            error!(error = ?e, replica = %self.target, key, "Object request failed");
            StorageError::new(StorageErrorKind::Http(format!(
                "{} {}: {}",
                self.target, key, e
            )))
        })?;
        check_status(response, key).await
    }
}

fn header_value(headers: &HeaderMap, name: impl reqwest::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn check_status(response: Response, key: &str) -> UploadfsResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let kind = match status {
        StatusCode::NOT_FOUND => StorageErrorKind::NotFound(format!("/{}", key)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StorageErrorKind::PermissionDenied(format!("/{}: {}", key, status))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, key, "Object store returned error");
            StorageErrorKind::Http(format!("/{}: {} {}", key, status, body))
        }
    };
    Err(StorageError::new(kind).into())
}

#[async_trait::async_trait]
impl ObjectClient for HttpObjectClient {
    fn target(&self) -> &BackendTarget {
        &self.target
    }

    #[instrument(skip(self, body, options), fields(replica = %self.target, size = body.len()))]
    async fn put(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> UploadfsResult<()> {
        let mut request = self
            .client
            .put(self.url(key, None))
            .header(CONTENT_TYPE, &options.content_type)
            .body(body);
        if let Some(encoding) = &options.content_encoding {
            request = request.header(CONTENT_ENCODING, encoding);
        }
        if let Some(cache_control) = &options.cache_control {
            request = request.header(CACHE_CONTROL, cache_control);
        }
        if let Some(acl) = &options.acl {
            request = request.header(ACL_HEADER, acl);
        }
        self.send(request, key).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(replica = %self.target))]
    async fn get(&self, key: &str) -> UploadfsResult<FetchedObject> {
        let response = self.send(self.client.get(self.url(key, None)), key).await?;
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            StorageError::new(StorageErrorKind::Http(format!("/{}: {}", key, e)))
        })?;
        Ok(FetchedObject {
            body: body.to_vec(),
            content_type: header_value(&headers, CONTENT_TYPE),
            content_encoding: header_value(&headers, CONTENT_ENCODING),
        })
    }

    #[instrument(skip(self), fields(replica = %self.target))]
    async fn exists(&self, key: &str) -> UploadfsResult<bool> {
        match self.send(self.client.head(self.url(key, None)), key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(replica = %self.target))]
    async fn delete(&self, key: &str) -> UploadfsResult<()> {
        self.send(self.client.delete(self.url(key, None)), key).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(replica = %self.target))]
    async fn copy(&self, from: &str, to: &str) -> UploadfsResult<()> {
        let response = self.send(self.client.get(self.url(from, None)), from).await?;
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            StorageError::new(StorageErrorKind::Http(format!("/{}: {}", from, e)))
        })?;
        let options = PutOptions {
            content_type: header_value(&headers, CONTENT_TYPE)
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            content_encoding: header_value(&headers, CONTENT_ENCODING),
            cache_control: header_value(&headers, CACHE_CONTROL),
            acl: header_value(&headers, ACL_HEADER),
        };
        self.put(to, body.to_vec(), &options).await
    }

    #[instrument(skip(self), fields(replica = %self.target))]
    async fn set_acl(&self, key: &str, acl: &str) -> UploadfsResult<()> {
        let request = self
            .client
            .put(self.url(key, Some("acl")))
            .header(ACL_HEADER, acl);
        self.send(request, key).await?;
        Ok(())
    }
}
