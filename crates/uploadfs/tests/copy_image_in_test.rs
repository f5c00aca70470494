//! Tests for the derivative pipeline through `Uploadfs`.

use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use uploadfs::{
    CopyImageOptions, CropSpec, ImageBackend, ImageCrateBackend, ImageInfo, ImageSize,
    LocalConfig, LocalStorage, Orientation, StorageConfig, TranscodeError, TranscodeErrorKind,
    Uploadfs, UploadfsConfig, UploadfsErrorKind, UploadfsResult,
};
use uploadfs_image::{ADJUSTED_ORIGINAL_STEM, ConvertContext, ConvertOutcome};

struct Fixture {
    uploads: TempDir,
    scratch: TempDir,
    source_dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            uploads: TempDir::new().unwrap(),
            scratch: TempDir::new().unwrap(),
            source_dir: TempDir::new().unwrap(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        self.scratch.path().join("work")
    }

    fn config(&self, sizes: Vec<ImageSize>) -> UploadfsConfig {
        UploadfsConfig::new(StorageConfig::Local(LocalConfig::new(
            self.uploads.path(),
            "/uploads",
        )))
        .with_image_sizes(sizes)
        .with_temp_path(self.temp_path())
    }

    async fn uploadfs(&self, sizes: Vec<ImageSize>, images: Arc<dyn ImageBackend>) -> Uploadfs {
        let config = self.config(sizes);
        let storage = match &config.storage {
            StorageConfig::Local(local) => LocalStorage::init(local).await.unwrap(),
            other => panic!("unexpected {:?}", other),
        };
        Uploadfs::with_backends(&config, Arc::new(storage), images).unwrap()
    }

    fn source(&self, name: &str, width: u32, height: u32, format: ImageFormat) -> PathBuf {
        let path = self.source_dir.path().join(name);
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        }))
        .save_with_format(&path, format)
        .unwrap();
        path
    }

    fn stored(&self, key: &str) -> PathBuf {
        self.uploads.path().join(key)
    }

    fn workspace_entries(&self) -> usize {
        match std::fs::read_dir(self.temp_path()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

fn sizes() -> Vec<ImageSize> {
    vec![
        ImageSize::new("small", 32, 32),
        ImageSize::new("large", 100, 100),
    ]
}

fn dimensions(path: &Path) -> (u32, u32) {
    image::image_dimensions(path).unwrap()
}

#[tokio::test]
async fn test_derivatives_named_after_true_format() {
    let fixture = Fixture::new();
    let fs = fixture.uploadfs(sizes(), Arc::new(ImageCrateBackend::new())).await;
    let source = fixture.source("upload.bin", 200, 100, ImageFormat::Png);

    let result = fs
        .copy_image_in(&source, "/images/photo", &CopyImageOptions::default())
        .await
        .unwrap();

    assert_eq!(result.base_path, "/images/photo");
    assert_eq!(result.extension, "png");
    assert_eq!((result.width, result.height), (200, 100));
    assert_eq!((result.original_width, result.original_height), (200, 100));

    assert_eq!(dimensions(&fixture.stored("images/photo.small.png")), (32, 16));
    assert_eq!(dimensions(&fixture.stored("images/photo.large.png")), (100, 50));
    assert_eq!(dimensions(&fixture.stored("images/photo.png")), (200, 100));
    assert_eq!(fixture.workspace_entries(), 0);
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_size_named_original_keeps_adjusted_original_apart() {
    let fixture = Fixture::new();
    let fs = fixture
        .uploadfs(
            vec![ImageSize::new("original", 20, 20)],
            Arc::new(ImageCrateBackend::new()),
        )
        .await;
    let source = fixture.source("upload.png", 200, 100, ImageFormat::Png);

    let result = fs
        .copy_image_in(&source, "/images/photo", &CopyImageOptions::default())
        .await
        .unwrap();

    assert_eq!((result.width, result.height), (200, 100));
    assert_eq!(dimensions(&fixture.stored("images/photo.png")), (200, 100));
    assert_eq!(
        dimensions(&fixture.stored("images/photo.original.png")),
        (20, 10)
    );
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_explicit_extension_is_kept_for_original() {
    let fixture = Fixture::new();
    let fs = fixture.uploadfs(sizes(), Arc::new(ImageCrateBackend::new())).await;
    let source = fixture.source("upload.jpeg", 64, 64, ImageFormat::Jpeg);

    let result = fs
        .copy_image_in(&source, "/pics/me.JPEG", &CopyImageOptions::default())
        .await
        .unwrap();

    assert_eq!(result.base_path, "/pics/me");
    assert_eq!(result.extension, "jpg");
    assert!(fixture.stored("pics/me.JPEG").is_file());
    assert!(fixture.stored("pics/me.small.jpg").is_file());
    assert!(fixture.stored("pics/me.large.jpg").is_file());
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_skip_original() {
    let fixture = Fixture::new();
    let fs = fixture.uploadfs(sizes(), Arc::new(ImageCrateBackend::new())).await;
    let source = fixture.source("upload.png", 50, 50, ImageFormat::Png);

    fs.copy_image_in(
        &source,
        "/a/b",
        &CopyImageOptions::default().with_copy_original(false),
    )
    .await
    .unwrap();

    assert!(!fixture.stored("a/b.png").exists());
    assert!(fixture.stored("a/b.small.png").is_file());
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_crop_replaces_original_and_reports_cropped_size() {
    let fixture = Fixture::new();
    let fs = fixture.uploadfs(sizes(), Arc::new(ImageCrateBackend::new())).await;
    let source = fixture.source("wide.png", 300, 100, ImageFormat::Png);

    let crop = CropSpec {
        left: 100,
        top: 0,
        width: 80,
        height: 80,
    };
    let result = fs
        .copy_image_in(&source, "/crop/me", &CopyImageOptions::default().with_crop(crop))
        .await
        .unwrap();

    assert_eq!((result.width, result.height), (80, 80));
    assert_eq!((result.original_width, result.original_height), (300, 100));
    assert_eq!(dimensions(&fixture.stored("crop/me.png")), (80, 80));
    assert_eq!(dimensions(&fixture.stored("crop/me.small.png")), (32, 32));
    assert_eq!(dimensions(&fixture.stored("crop/me.large.png")), (80, 80));
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_crop_outside_image_stores_nothing() {
    let fixture = Fixture::new();
    let fs = fixture.uploadfs(sizes(), Arc::new(ImageCrateBackend::new())).await;
    let source = fixture.source("small.png", 40, 40, ImageFormat::Png);

    let crop = CropSpec {
        left: 30,
        top: 30,
        width: 20,
        height: 20,
    };
    let err = fs
        .copy_image_in(&source, "/x/y", &CopyImageOptions::default().with_crop(crop))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), UploadfsErrorKind::Transcode(_)));
    assert!(!fixture.stored("x").exists());
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_no_sizes_copies_original_without_workspace() {
    let fixture = Fixture::new();
    let fs = fixture.uploadfs(Vec::new(), Arc::new(ImageCrateBackend::new())).await;
    let source = fixture.source("photo.png", 20, 10, ImageFormat::Png);

    let result = fs
        .copy_image_in(
            &source,
            "/plain/photo",
            &CopyImageOptions::default().with_orient_originals(false),
        )
        .await
        .unwrap();

    assert_eq!(result.extension, "png");
    assert_eq!(
        std::fs::read(fixture.stored("plain/photo.png")).unwrap(),
        std::fs::read(&source).unwrap()
    );
    assert!(!fixture.temp_path().exists());
    fs.destroy().await.unwrap();
}

/// Reports a rotated camera image and records how often it converts.
#[derive(Default)]
struct RotatedCamera {
    converts: AtomicUsize,
    fail: bool,
}

#[async_trait::async_trait]
impl ImageBackend for RotatedCamera {
    fn name(&self) -> &'static str {
        "rotated-camera"
    }

    async fn identify(&self, path: &Path) -> UploadfsResult<ImageInfo> {
        if path.file_stem().and_then(|s| s.to_str()) == Some(ADJUSTED_ORIGINAL_STEM) {
            // Upright after auto-orient.
            Ok(ImageInfo::from_raw("JPEG", 1936, 2592, Orientation::TopLeft, false))
        } else {
            Ok(ImageInfo::from_raw("JPEG", 2592, 1936, Orientation::RightTop, false))
        }
    }

    async fn convert(&self, context: &ConvertContext<'_>) -> UploadfsResult<ConvertOutcome> {
        self.converts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TranscodeError::new(TranscodeErrorKind::Failed {
                tool: "convert".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "corrupt image".to_string(),
            })
            .into());
        }
        let mut outcome = ConvertOutcome::default();
        for size in context.sizes {
            let path = context.size_path(size);
            tokio::fs::write(&path, size.name.as_bytes()).await.unwrap();
            outcome.derivatives.push((size.clone(), path));
        }
        if context.copy_original {
            let path = context.original_path();
            tokio::fs::write(&path, b"upright").await.unwrap();
            outcome.adjusted_original = Some(path);
        }
        Ok(outcome)
    }
}

#[tokio::test]
async fn test_rotated_source_reports_display_dimensions() {
    let fixture = Fixture::new();
    let camera = Arc::new(RotatedCamera::default());
    let fs = fixture.uploadfs(sizes(), camera.clone()).await;
    let source = fixture.source_dir.path().join("IMG_0001.JPG");
    std::fs::write(&source, b"camera bytes").unwrap();

    let info = fs.identify_local_image(&source).await.unwrap();
    assert_eq!((info.width, info.height), (1936, 2592));
    assert_eq!((info.original_width, info.original_height), (2592, 1936));

    let result = fs
        .copy_image_in(&source, "/phone/shot", &CopyImageOptions::default())
        .await
        .unwrap();
    assert_eq!(camera.converts.load(Ordering::SeqCst), 1);
    assert_eq!(result.extension, "jpg");
    assert_eq!((result.width, result.height), (1936, 2592));
    assert_eq!((result.original_width, result.original_height), (2592, 1936));
    assert_eq!(std::fs::read(fixture.stored("phone/shot.jpg")).unwrap(), b"upright");
    assert_eq!(std::fs::read(fixture.stored("phone/shot.small.jpg")).unwrap(), b"small");
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_unoriented_original_is_copied_before_convert() {
    let fixture = Fixture::new();
    let camera = Arc::new(RotatedCamera::default());
    let fs = fixture.uploadfs(sizes(), camera.clone()).await;
    let source = fixture.source_dir.path().join("IMG_0002.JPG");
    std::fs::write(&source, b"camera bytes").unwrap();

    let result = fs
        .copy_image_in(
            &source,
            "/phone/raw",
            &CopyImageOptions::default().with_orient_originals(false),
        )
        .await
        .unwrap();
    assert_eq!(
        std::fs::read(fixture.stored("phone/raw.jpg")).unwrap(),
        b"camera bytes"
    );
    assert_eq!((result.width, result.height), (1936, 2592));
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_transcode_failure_removes_workspace() {
    let fixture = Fixture::new();
    let camera = Arc::new(RotatedCamera {
        fail: true,
        ..RotatedCamera::default()
    });
    let fs = fixture.uploadfs(sizes(), camera).await;
    let source = fixture.source_dir.path().join("bad.jpg");
    std::fs::write(&source, b"junk").unwrap();

    let err = fs
        .copy_image_in(&source, "/bad/image", &CopyImageOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), UploadfsErrorKind::Transcode(_)));
    assert_eq!(fixture.workspace_entries(), 0);
    assert!(!fixture.stored("bad").exists());
    fs.destroy().await.unwrap();
}

#[tokio::test]
async fn test_image_sizes_and_temp_path_accessors() {
    let fixture = Fixture::new();
    let fs = fixture.uploadfs(sizes(), Arc::new(ImageCrateBackend::new())).await;
    assert_eq!(fs.image_sizes(), sizes().as_slice());
    assert_eq!(fs.temp_path(), fixture.temp_path().as_path());
    fs.destroy().await.unwrap();
}
