//! Mirrored object-store targets.
//!
//! Writes fan out to every target concurrently and report each failed
//! target by identity; targets that succeeded keep their changes. Reads
//! walk the targets in order and return the first success.

use crate::client::{FetchedObject, ObjectClient, PutOptions};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uploadfs_error::{
    ConfigError, ReplicaError, ReplicaErrorKind, ReplicaFailure, StorageError, StorageErrorKind,
    UploadfsError, UploadfsResult,
};

/// Ordered, non-empty list of mirrored targets.
#[derive(Clone)]
pub struct ReplicaSet {
    clients: Vec<Arc<dyn ObjectClient>>,
}

impl std::fmt::Debug for ReplicaSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.clients.iter().map(|c| c.target().to_string()))
            .finish()
    }
}

impl ReplicaSet {
    /// Create a set from its targets. The first target is read first.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when `clients` is empty.
    pub fn new(clients: Vec<Arc<dyn ObjectClient>>) -> Result<Self, ConfigError> {
        if clients.is_empty() {
            return Err(ConfigError::new("replica set needs at least one target"));
        }
        Ok(Self { clients })
    }

    /// A set with a single target.
    pub fn single(client: Arc<dyn ObjectClient>) -> Self {
        Self {
            clients: vec![client],
        }
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the set has no targets.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Display identities of every target, in order.
    pub fn target_names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.target().to_string()).collect()
    }

    /// Upload `body` to every target.
    #[instrument(skip(self, body, options), fields(replicas = self.len(), size = body.len()))]
    pub async fn put(&self, key: &str, body: Vec<u8>, options: &PutOptions) -> UploadfsResult<()> {
        let results = join_all(
            self.clients
                .iter()
                .map(|client| client.put(key, body.clone(), options)),
        )
        .await;
        self.settle("copy_in", results)
    }

    /// Fetch from the first target that has the object.
    ///
    /// # Errors
    ///
    /// `NotFound` when every target reported the object missing, otherwise
    /// a `ReplicaErrorKind::Exhausted` listing each target's failure.
    #[instrument(skip(self), fields(replicas = self.len()))]
    pub async fn get(&self, key: &str) -> UploadfsResult<FetchedObject> {
        let mut errors = Vec::with_capacity(self.clients.len());
        for client in &self.clients {
            match client.get(key).await {
                Ok(object) => {
                    debug!(replica = %client.target(), "Fetched object");
                    return Ok(object);
                }
                Err(e) => {
                    debug!(replica = %client.target(), error = %e, "Replica read failed, trying next");
                    errors.push((client.target().to_string(), e));
                }
            }
        }
        if errors.len() == 1 {
            if let Some((_, e)) = errors.pop() {
                return Err(e);
            }
        }
        if errors.iter().all(|(_, e)| e.is_not_found()) {
            return Err(StorageError::new(StorageErrorKind::NotFound(format!("/{}", key))).into());
        }
        let failures = errors
            .into_iter()
            .map(|(target, e)| ReplicaFailure::new(target, e))
            .collect();
        Err(ReplicaError::new(ReplicaErrorKind::Exhausted {
            operation: "copy_out".to_string(),
            failures,
        })
        .into())
    }

    /// Delete from every target.
    #[instrument(skip(self), fields(replicas = self.len()))]
    pub async fn delete(&self, key: &str) -> UploadfsResult<()> {
        let results = join_all(self.clients.iter().map(|client| client.delete(key))).await;
        self.settle("remove", results)
    }

    /// Apply a canned ACL on every target.
    #[instrument(skip(self), fields(replicas = self.len()))]
    pub async fn set_acl(&self, key: &str, acl: &str) -> UploadfsResult<()> {
        let results = join_all(self.clients.iter().map(|client| client.set_acl(key, acl))).await;
        self.settle("set_acl", results)
    }

    /// Move an object on every target.
    ///
    /// Every target must hold `from` before anything is changed. When some
    /// targets lack it the call fails with `ReplicaErrorKind::Diverged`
    /// naming them; when all lack it the result is `NotFound`. A copy or
    /// delete that fails after the check is reported per target and is not
    /// rolled back.
    #[instrument(skip(self), fields(replicas = self.len()))]
    pub async fn rename(&self, operation: &str, from: &str, to: &str) -> UploadfsResult<()> {
        let present = join_all(self.clients.iter().map(|client| client.exists(from))).await;
        let mut missing = Vec::new();
        let mut probes = Vec::with_capacity(present.len());
        for (client, result) in self.clients.iter().zip(present) {
            match result {
                Ok(true) => probes.push(Ok(())),
                Ok(false) => {
                    missing.push(client.target().to_string());
                    probes.push(Ok(()));
                }
                Err(e) => probes.push(Err(e)),
            }
        }
        if probes.iter().any(Result::is_err) {
            return self.settle(operation, probes);
        }
        if missing.len() == self.clients.len() {
            return Err(StorageError::new(StorageErrorKind::NotFound(format!("/{}", from))).into());
        }
        if !missing.is_empty() {
            warn!(path = %from, missing = ?missing, "Replicas diverged, refusing to rename");
            return Err(ReplicaError::new(ReplicaErrorKind::Diverged {
                path: format!("/{}", from),
                targets: missing,
            })
            .into());
        }

        let results = join_all(self.clients.iter().map(|client| async move {
            client.copy(from, to).await?;
            client.delete(from).await
        }))
        .await;
        self.settle(operation, results)
    }

    /// Fold per-target results into one outcome.
    ///
    /// A single-target set surfaces its error unchanged.
    fn settle(&self, operation: &str, results: Vec<UploadfsResult<()>>) -> UploadfsResult<()> {
        if self.clients.len() == 1 && results.len() == 1 {
            return results.into_iter().next().unwrap_or(Ok(()));
        }
        let failures: Vec<ReplicaFailure> = self
            .clients
            .iter()
            .zip(results)
            .filter_map(|(client, result)| {
                result.err().map(|e: UploadfsError| {
                    warn!(replica = %client.target(), operation, error = %e, "Replica operation failed");
                    ReplicaFailure::new(client.target().to_string(), e)
                })
            })
            .collect();
        if failures.is_empty() {
            return Ok(());
        }
        Err(ReplicaError::new(ReplicaErrorKind::Failed {
            operation: operation.to_string(),
            failures,
        })
        .into())
    }
}
