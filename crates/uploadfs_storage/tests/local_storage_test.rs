//! Tests for the local filesystem backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use uploadfs_core::StoragePath;
use uploadfs_error::{StorageErrorKind, UploadfsErrorKind};
use uploadfs_storage::{CopyOptions, DisabledFileKey, LocalConfig, LocalStorage, StorageBackend};

fn path(p: &str) -> StoragePath {
    StoragePath::parse(p).unwrap()
}

async fn storage(root: &TempDir, key: Option<&str>) -> LocalStorage {
    let mut config = LocalConfig::new(root.path().join("uploads"), "http://localhost/uploads")
        .with_gc_interval(Duration::from_secs(3600));
    if let Some(key) = key {
        config = config.with_disabled_file_key(key);
    }
    LocalStorage::init(&config).await.unwrap()
}

async fn source(dir: &TempDir, name: &str, body: &[u8]) -> std::path::PathBuf {
    let file = dir.path().join(name);
    tokio::fs::write(&file, body).await.unwrap();
    file
}

#[tokio::test]
async fn test_copy_in_creates_nested_directories() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, None).await;
    let local = source(&dir, "t.txt", b"nested").await;

    storage
        .copy_in(&local, &path("/a/b/c/t.txt"), &CopyOptions::default())
        .await
        .unwrap();
    assert!(storage.root().join("a/b/c/t.txt").is_file());

    let out = dir.path().join("out.txt");
    storage
        .copy_out(&path("/a/b/c/t.txt"), &out, &CopyOptions::default())
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&out).await.unwrap(), b"nested");
    storage.destroy().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_copy_in_survives_concurrent_sweeps() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(storage(&dir, None).await);
    let body = b"race the sweeper ".repeat(64);
    let local = source(&dir, "t.txt", &body).await;
    let stop = Arc::new(AtomicBool::new(false));

    let sweeper = {
        let storage = Arc::clone(&storage);
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            while !stop.load(Ordering::SeqCst) {
                for directory in ["/a/b/c", "/a/b", "/a"] {
                    storage.gc().register(Some(path(directory)));
                }
                storage.gc().sweep_now().await;
                tokio::task::yield_now().await;
            }
        })
    };

    for _ in 0..200 {
        storage
            .copy_in(&local, &path("/a/b/c/t.txt"), &CopyOptions::default())
            .await
            .unwrap();
        let stored = tokio::fs::read(storage.root().join("a/b/c/t.txt"))
            .await
            .unwrap();
        assert_eq!(stored, body);
        storage.remove(&path("/a/b/c/t.txt")).await.unwrap();
    }

    stop.store(true, Ordering::SeqCst);
    sweeper.await.unwrap();
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_copy_in_below_a_file_fails_without_leftovers() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, None).await;
    let local = source(&dir, "t.txt", b"x").await;
    tokio::fs::write(storage.root().join("a"), b"in the way")
        .await
        .unwrap();

    let err = storage
        .copy_in(&local, &path("/a/b/t.txt"), &CopyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        UploadfsErrorKind::Storage(e) if matches!(e.kind, StorageErrorKind::Io(_))
    ));
    assert!(!storage.root().join("a/b/t.txt").exists());
    assert_eq!(
        tokio::fs::read(storage.root().join("a")).await.unwrap(),
        b"in the way"
    );
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_remove_then_sweeps_prune_empty_chain() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, None).await;
    let local = source(&dir, "t.txt", b"x").await;
    storage
        .copy_in(&local, &path("/a/b/c/t.txt"), &CopyOptions::default())
        .await
        .unwrap();

    storage.remove(&path("/a/b/c/t.txt")).await.unwrap();
    assert!(storage.root().join("a/b/c").is_dir());

    assert_eq!(storage.gc().sweep_now().await, 1);
    assert!(!storage.root().join("a/b/c").exists());
    assert_eq!(storage.gc().sweep_now().await, 1);
    assert!(!storage.root().join("a/b").exists());
    assert_eq!(storage.gc().sweep_now().await, 1);
    assert!(!storage.root().join("a").exists());
    assert_eq!(storage.gc().sweep_now().await, 0);
    assert!(storage.root().is_dir());
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_sweep_keeps_directories_with_siblings() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, None).await;
    let local = source(&dir, "t.txt", b"x").await;
    for p in ["/a/b/one.txt", "/a/two.txt"] {
        storage
            .copy_in(&local, &path(p), &CopyOptions::default())
            .await
            .unwrap();
    }

    storage.remove(&path("/a/b/one.txt")).await.unwrap();
    storage.gc().sweep_now().await;
    storage.gc().sweep_now().await;

    assert!(!storage.root().join("a/b").exists());
    assert!(storage.root().join("a/two.txt").is_file());
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_background_sweeper_runs_on_interval() {
    let dir = TempDir::new().unwrap();
    let config = LocalConfig::new(dir.path().join("uploads"), "/uploads")
        .with_gc_interval(Duration::from_millis(10));
    let storage = LocalStorage::init(&config).await.unwrap();
    let local = source(&dir, "t.txt", b"x").await;
    storage
        .copy_in(&local, &path("/x/y/t.txt"), &CopyOptions::default())
        .await
        .unwrap();
    storage.remove(&path("/x/y/t.txt")).await.unwrap();

    let gone = storage.root().join("x");
    for _ in 0..200 {
        if !gone.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!gone.exists());
    assert!(storage.root().is_dir());
    storage.destroy().await.unwrap();
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_keyed_disable_hides_file() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, Some("This is my disabled file key")).await;
    let key = DisabledFileKey::new("This is my disabled file key").unwrap();
    let local = source(&dir, "doc.txt", b"secret contents").await;
    let object = path("/docs/doc.txt");
    storage
        .copy_in(&local, &object, &CopyOptions::default())
        .await
        .unwrap();

    storage.disable(&object).await.unwrap();
    assert!(!storage.root().join("docs/doc.txt").exists());
    assert!(key.disabled_path(&object).to_fs_path(storage.root()).is_file());

    let out = dir.path().join("out.txt");
    let err = storage
        .copy_out(&object, &out, &CopyOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    storage.enable(&object).await.unwrap();
    storage
        .copy_out(&object, &out, &CopyOptions::default())
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&out).await.unwrap(), b"secret contents");
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_remove_reaches_disabled_file() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, Some("k")).await;
    let local = source(&dir, "doc.txt", b"x").await;
    let object = path("/doc.txt");
    storage
        .copy_in(&local, &object, &CopyOptions::default())
        .await
        .unwrap();
    storage.disable(&object).await.unwrap();
    storage.remove(&object).await.unwrap();
    assert!(storage.list_files().await.unwrap().is_empty());
    storage.destroy().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_unkeyed_disable_clears_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, None).await;
    let local = source(&dir, "doc.txt", b"x").await;
    let object = path("/doc.txt");
    storage
        .copy_in(&local, &object, &CopyOptions::default())
        .await
        .unwrap();
    let file = storage.root().join("doc.txt");

    storage.disable(&object).await.unwrap();
    let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0);

    storage.enable(&object).await.unwrap();
    let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
    storage.destroy().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_migrations_between_mechanisms() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, Some("k")).await;
    let key = DisabledFileKey::new("k").unwrap();
    let local = source(&dir, "doc.txt", b"x").await;
    let hidden = path("/a/hidden.txt");
    let visible = path("/a/visible.txt");
    for object in [&hidden, &visible] {
        storage
            .copy_in(&local, object, &CopyOptions::default())
            .await
            .unwrap();
    }
    let hidden_file = hidden.to_fs_path(storage.root());
    std::fs::set_permissions(&hidden_file, std::fs::Permissions::from_mode(0o000)).unwrap();

    storage.migrate_to_disabled_file_key().await.unwrap();
    let renamed = key.disabled_path(&hidden).to_fs_path(storage.root());
    assert!(!hidden_file.exists());
    assert_eq!(
        std::fs::metadata(&renamed).unwrap().permissions().mode() & 0o777,
        0o644
    );
    assert!(visible.to_fs_path(storage.root()).is_file());

    storage.migrate_from_disabled_file_key().await.unwrap();
    assert!(!renamed.exists());
    assert_eq!(
        std::fs::metadata(&hidden_file).unwrap().permissions().mode() & 0o777,
        0
    );
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_copy_out_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, None).await;
    let err = storage
        .copy_out(
            &path("/nope.txt"),
            &dir.path().join("out"),
            &CopyOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(format!("{}", err).contains("/nope.txt"));
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_url_joins_base() {
    let dir = TempDir::new().unwrap();
    let storage = storage(&dir, None).await;
    assert_eq!(storage.url("/a/b.txt"), "http://localhost/uploads/a/b.txt");
    assert_eq!(storage.url(""), "http://localhost/uploads");
    storage.destroy().await.unwrap();
}

#[tokio::test]
async fn test_missing_settings_rejected() {
    let dir = TempDir::new().unwrap();
    let no_url = LocalConfig::new(dir.path(), "");
    assert!(LocalStorage::init(&no_url).await.is_err());
    let empty_key = LocalConfig::new(dir.path(), "/u").with_disabled_file_key("");
    assert!(LocalStorage::init(&empty_key).await.is_err());
}
