//! End-to-end tests of the `Uploadfs` facade.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uploadfs::{
    CopyOptions, ImageBackendKind, ImageCrateBackend, LocalConfig, StorageConfig, Uploadfs,
    UploadfsConfig,
};
use uploadfs_storage::{BackendTarget, MemoryObjectClient, S3Config, S3Storage};

fn local_config(root: &TempDir) -> UploadfsConfig {
    UploadfsConfig::new(StorageConfig::Local(
        LocalConfig::new(root.path(), "/uploads").with_gc_interval(Duration::from_millis(10)),
    ))
    .with_image_backend(ImageBackendKind::Image)
}

#[tokio::test]
async fn test_nested_copy_in_then_remove_collects_directories() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let fs = Uploadfs::init(&local_config(&root)).await.unwrap();

    let local = scratch.path().join("t.txt");
    tokio::fs::write(&local, b"nested").await.unwrap();
    fs.copy_in(&local, "/a/b/c/t.txt", &CopyOptions::default())
        .await
        .unwrap();
    assert!(root.path().join("a/b/c/t.txt").is_file());

    let out = scratch.path().join("out.txt");
    fs.copy_out("/a/b/c/t.txt", &out, &CopyOptions::default())
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&out).await.unwrap(), b"nested");

    fs.remove("/a/b/c/t.txt").await.unwrap();
    let mut collected = false;
    for _ in 0..200 {
        if !root.path().join("a").exists() {
            collected = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(collected, "empty directories were not collected");
    assert!(root.path().is_dir());
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_disable_then_enable_restores_bytes() {
    let root = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let mut config = local_config(&root);
    if let StorageConfig::Local(local) = &mut config.storage {
        local.disabled_file_key = Some("secret".to_string());
    }
    let fs = Uploadfs::init(&config).await.unwrap();

    let local = scratch.path().join("doc.txt");
    tokio::fs::write(&local, b"keep me").await.unwrap();
    fs.copy_in(&local, "/docs/doc.txt", &CopyOptions::default())
        .await
        .unwrap();

    fs.disable("/docs/doc.txt").await.unwrap();
    let out = scratch.path().join("out.txt");
    let err = fs
        .copy_out("/docs/doc.txt", &out, &CopyOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    fs.enable("/docs/doc.txt").await.unwrap();
    fs.copy_out("/docs/doc.txt", &out, &CopyOptions::default())
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&out).await.unwrap(), b"keep me");
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_invalid_path_is_rejected() {
    let root = TempDir::new().unwrap();
    let fs = Uploadfs::init(&local_config(&root)).await.unwrap();
    assert!(fs.remove("/a/../../etc/passwd").await.is_err());
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_urls_with_and_without_cdn() {
    let root = TempDir::new().unwrap();
    let fs = Uploadfs::init(&local_config(&root)).await.unwrap();
    assert_eq!(fs.url("/a/b.txt"), "/uploads/a/b.txt");
    assert_eq!(fs.url(""), "/uploads");
    fs.destroy().await.unwrap();

    let fs = Uploadfs::init(&local_config(&root).with_cdn("https://cdn.example.com"))
        .await
        .unwrap();
    assert_eq!(fs.url("/a/b.txt"), "https://cdn.example.com/a/b.txt");
    fs.destroy().await.unwrap();

    let mut config = local_config(&root).with_cdn("https://cdn.example.com");
    if let Some(cdn) = &mut config.cdn {
        cdn.enabled = false;
    }
    let fs = Uploadfs::init(&config).await.unwrap();
    assert_eq!(fs.url("/a/b.txt"), "/uploads/a/b.txt");
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_object_store_round_trip_with_gzip() {
    let scratch = TempDir::new().unwrap();
    let client = Arc::new(MemoryObjectClient::new(BackendTarget::new("s3", "media")));
    let s3 = S3Config::new("media");
    let storage = S3Storage::with_client(&s3, client.clone()).unwrap();
    let config = UploadfsConfig::new(StorageConfig::S3(s3));
    let fs = Uploadfs::with_backends(
        &config,
        Arc::new(storage),
        Arc::new(ImageCrateBackend::new()),
    )
    .unwrap();

    let body = b"{\"hello\": \"world\"}\n".repeat(40);
    let local = scratch.path().join("data.json");
    tokio::fs::write(&local, &body).await.unwrap();
    fs.copy_in(&local, "/data/data.json", &CopyOptions::default())
        .await
        .unwrap();
    let stored = client.object("data/data.json").unwrap();
    assert_eq!(stored.content_encoding.as_deref(), Some("gzip"));

    let out = scratch.path().join("out.json");
    fs.copy_out("/data/data.json", &out, &CopyOptions::default())
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&out).await.unwrap(), body);
    assert_eq!(
        fs.url("/data/data.json"),
        "https://media.s3.amazonaws.com/data/data.json"
    );
}

#[tokio::test]
async fn test_config_file_drives_init() {
    let root = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("uploadfs.toml");
    let text = format!(
        "image = \"image\"\nscaled_jpeg_quality = 70\n\n[[image_sizes]]\nname = \"thumb\"\nwidth = 64\nheight = 64\n\n[storage]\nbackend = \"local\"\nuploads_path = {:?}\nuploads_url = \"/media\"\n",
        root.path().display().to_string()
    );
    std::fs::write(&file, text).unwrap();

    let config = UploadfsConfig::from_file(&file).unwrap();
    assert_eq!(config.scaled_jpeg_quality, 70);
    let fs = Uploadfs::init(&config).await.unwrap();
    assert_eq!(fs.images().name(), "image");
    assert_eq!(fs.image_sizes()[0].name, "thumb");
    assert_eq!(fs.url("/x.png"), "/media/x.png");
    fs.destroy().await.unwrap();
}
