//! In-process object store.

use super::{BackendTarget, FetchedObject, ObjectClient, PutOptions};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use uploadfs_error::{StorageError, StorageErrorKind, UploadfsResult};

/// Snapshot of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    /// Body in its transport encoding
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
    /// Content encoding
    pub content_encoding: Option<String>,
    /// Cache-Control value
    pub cache_control: Option<String>,
    /// Canned ACL
    pub acl: Option<String>,
}

/// Object client that keeps everything in memory.
///
/// Useful for development and tests. A client can be taken offline to
/// simulate an unreachable replica.
#[derive(Debug)]
pub struct MemoryObjectClient {
    target: BackendTarget,
    objects: RwLock<BTreeMap<String, MemoryObject>>,
    offline: AtomicBool,
}

impl MemoryObjectClient {
    /// Create an empty store for `target`.
    pub fn new(target: BackendTarget) -> Self {
        Self {
            target,
            objects: RwLock::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Stored keys in order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Snapshot of one object.
    pub fn object(&self, key: &str) -> Option<MemoryObject> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    #[track_caller]
    fn check_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::new(StorageErrorKind::Http(format!(
                "{} is unreachable",
                self.target
            ))));
        }
        Ok(())
    }

    #[track_caller]
    fn not_found(key: &str) -> StorageError {
        StorageError::new(StorageErrorKind::NotFound(format!("/{}", key)))
    }
}

#[async_trait::async_trait]
impl ObjectClient for MemoryObjectClient {
    fn target(&self) -> &BackendTarget {
        &self.target
    }

    async fn put(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> UploadfsResult<()> {
        self.check_online()?;
        let object = MemoryObject {
            body,
            content_type: options.content_type.clone(),
            content_encoding: options.content_encoding.clone(),
            cache_control: options.cache_control.clone(),
            acl: options.acl.clone(),
        };
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), object);
        Ok(())
    }

    async fn get(&self, key: &str) -> UploadfsResult<FetchedObject> {
        self.check_online()?;
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let object = objects.get(key).ok_or_else(|| Self::not_found(key))?;
        Ok(FetchedObject {
            body: object.body.clone(),
            content_type: Some(object.content_type.clone()),
            content_encoding: object.content_encoding.clone(),
        })
    }

    async fn exists(&self, key: &str) -> UploadfsResult<bool> {
        self.check_online()?;
        Ok(self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key))
    }

    async fn delete(&self, key: &str) -> UploadfsResult<()> {
        self.check_online()?;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(key).into())
    }

    async fn copy(&self, from: &str, to: &str) -> UploadfsResult<()> {
        self.check_online()?;
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        let object = objects.get(from).cloned().ok_or_else(|| Self::not_found(from))?;
        objects.insert(to.to_string(), object);
        Ok(())
    }

    async fn set_acl(&self, key: &str, acl: &str) -> UploadfsResult<()> {
        self.check_online()?;
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        let object = objects.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        object.acl = Some(acl.to_string());
        Ok(())
    }
}
