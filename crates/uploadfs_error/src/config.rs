//! Configuration error types.

/// A rejected setting, with where the rejection happened.
///
/// `setting` names the offending key (`bucket`, `disabled_file_key`,
/// `image_sizes`, ...) when one is known, so callers can point users at
/// the line of their configuration to fix.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// Human readable reason
    pub message: String,
    /// The offending setting, if the error is about one
    pub setting: Option<String>,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a ConfigError with a free-form message.
    ///
    /// # Examples
    ///
    /// ```
    /// use uploadfs_error::ConfigError;
    ///
    /// let err = ConfigError::new("replica set needs at least one target");
    /// assert!(err.setting.is_none());
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            setting: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A setting the named storage backend cannot start without.
    ///
    /// ```
    /// use uploadfs_error::ConfigError;
    ///
    /// let err = ConfigError::missing("bucket", "s3");
    /// assert_eq!(err.setting.as_deref(), Some("bucket"));
    /// assert_eq!(err.message, "bucket must be set for the s3 backend");
    /// ```
    #[track_caller]
    pub fn missing(setting: &str, backend: &str) -> Self {
        Self::new(format!("{} must be set for the {} backend", setting, backend))
            .for_setting(setting)
    }

    /// Attach the offending setting to an existing error.
    pub fn for_setting(mut self, setting: impl Into<String>) -> Self {
        self.setting = Some(setting.into());
        self
    }
}
