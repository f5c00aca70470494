//! Deferred removal of empty directories.
//!
//! Removing a file leaves its directory behind. Rather than pruning
//! inline, which races with concurrent `copy_in` calls creating the same
//! directories, the directory is recorded as a candidate and a background
//! task tries a non-recursive `remove_dir` on it later. A non-empty
//! directory simply fails to go away. Each successful removal nominates
//! the parent for the following pass, so an emptied chain unwinds one
//! level per pass and the uploads root itself is never touched.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uploadfs_core::StoragePath;

type Candidates = Arc<Mutex<HashSet<StoragePath>>>;

/// Default delay between sweeps.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_millis(1000);

/// Background sweeper for one uploads root.
#[derive(Debug)]
pub struct DirectoryGc {
    root: PathBuf,
    candidates: Candidates,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DirectoryGc {
    /// Spawn the sweeper. Must be called inside a tokio runtime.
    pub fn start(root: impl Into<PathBuf>, interval: Duration) -> Self {
        let root = root.into();
        let candidates: Candidates = Arc::default();
        let (shutdown, mut stopped) = watch::channel(false);

        let task_root = root.clone();
        let task_candidates = Arc::clone(&candidates);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        sweep(&task_root, &task_candidates).await;
                    }
                    _ = stopped.changed() => break,
                }
            }
            debug!(root = %task_root.display(), "Directory sweeper stopped");
        });

        info!(root = %root.display(), interval_ms = interval.as_millis() as u64, "Started directory sweeper");
        Self {
            root,
            candidates,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// Nominate a directory for removal. `None` (the root) is ignored.
    pub fn register(&self, directory: Option<StoragePath>) {
        if let Some(directory) = directory {
            self.candidates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(directory);
        }
    }

    /// Directories waiting for the next pass.
    pub fn pending(&self) -> Vec<StoragePath> {
        let mut pending: Vec<_> = self
            .candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        pending.sort();
        pending
    }

    /// Run one pass immediately, returning how many directories went away.
    pub async fn sweep_now(&self) -> usize {
        sweep(&self.root, &self.candidates).await
    }

    /// Stop the background task and wait for it. Safe to call twice.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Directory sweeper ended abnormally");
            }
        }
    }
}

impl Drop for DirectoryGc {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// One sweep pass over the current candidates.
async fn sweep(root: &Path, candidates: &Candidates) -> usize {
    let mut batch: Vec<StoragePath> = {
        let mut guard = candidates.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard).into_iter().collect()
    };
    if batch.is_empty() {
        return 0;
    }
    batch.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.cmp(b)));

    let mut removed = 0;
    let mut next = Vec::new();
    for directory in batch {
        match tokio::fs::remove_dir(directory.to_fs_path(root)).await {
            Ok(()) => {
                debug!(directory = %directory, "Removed empty directory");
                removed += 1;
                if let Some(parent) = directory.parent() {
                    next.push(parent);
                }
            }
            Err(e) => debug!(directory = %directory, error = %e, "Directory kept"),
        }
    }

    if !next.is_empty() {
        candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(next);
    }
    removed
}
