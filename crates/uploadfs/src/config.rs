//! Configuration for an uploadfs instance.
//!
//! Sources are layered, later ones winning:
//! 1. Bundled defaults (`uploadfs.toml` shipped with the crate)
//! 2. `~/.config/uploadfs/uploadfs.toml`
//! 3. `./uploadfs.toml`
//! 4. `UPLOADFS__*` environment variables, `__` separating nested keys

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use uploadfs_core::ImageSize;
use uploadfs_error::{ConfigError, UploadfsError, UploadfsResult};
use uploadfs_image::ImageBackendKind;
use uploadfs_storage::StorageConfig;

const DEFAULT_CONFIG: &str = include_str!("../uploadfs.toml");

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "UPLOADFS";

fn default_jpeg_quality() -> u8 {
    80
}

fn default_true() -> bool {
    true
}

/// Serve public URLs from a CDN instead of the backend's own base URL.
///
/// ```toml
/// [cdn]
/// url = "https://cdn.example.com"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnConfig {
    /// Defaults to true whenever a `[cdn]` table is present
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// CDN base URL
    pub url: String,
}

/// Top-level configuration.
///
/// # Example
///
/// ```
/// use uploadfs::UploadfsConfig;
///
/// let config = UploadfsConfig::from_toml_str(r#"
///     [storage]
///     backend = "local"
///     uploads_path = "/srv/uploads"
///     uploads_url = "/uploads"
/// "#).unwrap();
/// assert_eq!(config.scaled_jpeg_quality, 80);
/// assert!(config.image_sizes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadfsConfig {
    /// Storage backend settings, tagged by `backend`
    pub storage: StorageConfig,

    /// Parent directory for derivative workspaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_path: Option<PathBuf>,

    /// Derivatives produced by `copy_image_in`
    #[serde(default)]
    pub image_sizes: Vec<ImageSize>,

    /// JPEG quality for scaled derivatives
    #[serde(default = "default_jpeg_quality")]
    pub scaled_jpeg_quality: u8,

    /// Rotate and crop originals before storing them
    #[serde(default = "default_true")]
    pub orient_originals: bool,

    /// Store originals at all
    #[serde(default = "default_true")]
    pub copy_original: bool,

    /// Image backend, detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageBackendKind>,

    /// Optional CDN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<CdnConfig>,
}

impl UploadfsConfig {
    /// Configuration with defaults for everything except storage.
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            temp_path: None,
            image_sizes: Vec::new(),
            scaled_jpeg_quality: default_jpeg_quality(),
            orient_originals: true,
            copy_original: true,
            image: None,
            cdn: None,
        }
    }

    /// Set the derivative sizes.
    pub fn with_image_sizes(mut self, sizes: Vec<ImageSize>) -> Self {
        self.image_sizes = sizes;
        self
    }

    /// Set the workspace parent directory.
    pub fn with_temp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_path = Some(path.into());
        self
    }

    /// Choose the image backend instead of detecting one.
    pub fn with_image_backend(mut self, kind: ImageBackendKind) -> Self {
        self.image = Some(kind);
        self
    }

    /// Serve URLs from a CDN.
    pub fn with_cdn(mut self, url: impl Into<String>) -> Self {
        self.cdn = Some(CdnConfig {
            enabled: true,
            url: url.into(),
        });
        self
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> UploadfsResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                UploadfsError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                UploadfsError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> UploadfsResult<Self> {
        debug!("Loading configuration from file");
        Self::build(Config::builder().add_source(File::from(path.as_ref())))
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the text cannot be parsed or validated.
    pub fn from_toml_str(toml: &str) -> UploadfsResult<Self> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    /// Load with precedence: environment > current dir > home dir > bundled.
    ///
    /// User files are optional and skipped when absent.
    ///
    /// ```no_run
    /// use uploadfs::UploadfsConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = UploadfsConfig::load()?;
    /// println!("storing on {}", config.storage.backend_name());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> UploadfsResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/uploadfs/uploadfs.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("uploadfs").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder)
    }

    /// Check values serde cannot.
    ///
    /// # Errors
    ///
    /// `ConfigError` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.scaled_jpeg_quality) {
            return Err(ConfigError::new(format!(
                "scaled_jpeg_quality must be between 1 and 100, got {}",
                self.scaled_jpeg_quality
            ))
            .for_setting("scaled_jpeg_quality"));
        }
        let mut names = HashSet::new();
        for size in &self.image_sizes {
            size.validate()?;
            if !names.insert(size.name.as_str()) {
                return Err(ConfigError::new(format!(
                    "image size {} is defined more than once",
                    size.name
                ))
                .for_setting("image_sizes"));
            }
        }
        if let Some(cdn) = &self.cdn {
            if cdn.enabled && cdn.url.is_empty() {
                return Err(ConfigError::new("cdn.url must not be empty").for_setting("cdn.url"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: &str = r#"
        [storage]
        backend = "local"
        uploads_path = "/srv/uploads"
        uploads_url = "/uploads"
    "#;

    #[test]
    fn test_bundled_defaults_parse() {
        let text = format!("{}\n{}", DEFAULT_CONFIG, LOCAL);
        let config = UploadfsConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.image_sizes.len(), 5);
        assert_eq!(config.image_sizes[0].name, "full");
        assert!(config.orient_originals);
        assert_eq!(config.image, None);
    }

    #[test]
    fn test_cdn_enabled_by_default() {
        let text = format!("{}\n[cdn]\nurl = \"https://cdn.test\"\n", LOCAL);
        let config = UploadfsConfig::from_toml_str(&text).unwrap();
        assert_eq!(
            config.cdn,
            Some(CdnConfig {
                enabled: true,
                url: "https://cdn.test".to_string()
            })
        );
    }

    #[test]
    fn test_image_backend_names() {
        let text = format!("image = \"imagemagick\"\n{}", LOCAL);
        let config = UploadfsConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.image, Some(ImageBackendKind::ImageMagick));
    }

    #[test]
    fn test_missing_storage_is_config_error() {
        assert!(UploadfsConfig::from_toml_str("copy_original = false").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let storage: StorageConfig = serde_json::from_str(
            r#"{"backend": "local", "uploads_path": "/u", "uploads_url": "/u"}"#,
        )
        .unwrap();
        let mut config = UploadfsConfig::new(storage).with_image_sizes(vec![
            ImageSize::new("a", 10, 10),
            ImageSize::new("a", 20, 20),
        ]);
        let err = config.validate().unwrap_err();
        assert_eq!(err.setting.as_deref(), Some("image_sizes"));

        config.image_sizes.truncate(1);
        assert!(config.validate().is_ok());
        config.scaled_jpeg_quality = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.setting.as_deref(), Some("scaled_jpeg_quality"));
    }
}
