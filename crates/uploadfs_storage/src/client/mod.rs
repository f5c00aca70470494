//! Object-store client contract.
//!
//! The object backends never speak a cloud wire protocol directly. They
//! talk to an [`ObjectClient`], one per physical target, which can be an
//! SDK adapter, the bundled [`HttpObjectClient`], or the in-process
//! [`MemoryObjectClient`].

mod http;
mod memory;

pub use http::HttpObjectClient;
pub use memory::{MemoryObject, MemoryObjectClient};

use uploadfs_error::UploadfsResult;

/// One physical storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendTarget {
    /// Account or project owning the container
    pub account: String,
    /// Bucket or container name
    pub container: String,
}

impl BackendTarget {
    /// Create a new target.
    pub fn new(account: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
        }
    }
}

impl std::fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account, self.container)
    }
}

/// Metadata sent with an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// MIME type of the decoded content
    pub content_type: String,
    /// Transport encoding of the body (`gzip`), if any
    pub content_encoding: Option<String>,
    /// Cache-Control header value
    pub cache_control: Option<String>,
    /// Canned ACL to apply (`public-read`, `private`), if the store has ACLs
    pub acl: Option<String>,
}

/// An object as returned by the store, still in its transport encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedObject {
    /// Body bytes as stored
    pub body: Vec<u8>,
    /// Stored content type
    pub content_type: Option<String>,
    /// Stored content encoding
    pub content_encoding: Option<String>,
}

/// Primitive operations against one object-store target.
///
/// Keys never start with a slash. A missing key is reported as
/// `StorageErrorKind::NotFound`.
#[async_trait::async_trait]
pub trait ObjectClient: Send + Sync {
    /// Which target this client talks to.
    fn target(&self) -> &BackendTarget;

    /// Store `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> UploadfsResult<()>;

    /// Fetch an object.
    async fn get(&self, key: &str) -> UploadfsResult<FetchedObject>;

    /// Whether `key` exists.
    async fn exists(&self, key: &str) -> UploadfsResult<bool>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> UploadfsResult<()>;

    /// Copy an object within the target, preserving its metadata.
    async fn copy(&self, from: &str, to: &str) -> UploadfsResult<()>;

    /// Apply a canned ACL to an existing object.
    async fn set_acl(&self, key: &str, acl: &str) -> UploadfsResult<()>;
}
