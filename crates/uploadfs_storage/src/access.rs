//! Keyed path obfuscation for backends without per-object ACLs.
//!
//! Disabling an object renames it to
//! `{path}-disabled-{hex(HMAC-SHA256(key, path))}`. The suffix cannot be
//! guessed without the key, and because each suffix is an HMAC of its own
//! path, learning one disabled path reveals nothing about any other.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use uploadfs_core::StoragePath;
use uploadfs_error::ConfigError;

type HmacSha256 = Hmac<Sha256>;

/// Marker between an object path and its digest.
pub const DISABLED_MARKER: &str = "-disabled-";

/// Secret used to derive disabled paths.
#[derive(Clone)]
pub struct DisabledFileKey {
    mac: HmacSha256,
}

impl DisabledFileKey {
    /// Create a key from the configured secret.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an empty secret.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::new("disabled_file_key must not be empty").for_setting("disabled_file_key"));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ConfigError::new(format!("invalid disabled_file_key: {}", e)))?;
        Ok(Self { mac })
    }

    /// Hex HMAC-SHA256 of the external (leading slash) form of `path`.
    pub fn digest_hex(&self, path: &StoragePath) -> String {
        let mut mac = self.mac.clone();
        mac.update(path.to_string().as_bytes());
        format!("{:x}", mac.finalize().into_bytes())
    }

    /// The obfuscated path `path` is moved to while disabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use uploadfs_core::StoragePath;
    /// use uploadfs_storage::DisabledFileKey;
    ///
    /// let key = DisabledFileKey::new("secret").unwrap();
    /// let path = StoragePath::parse("/docs/a.pdf").unwrap();
    /// let hidden = key.disabled_path(&path);
    /// assert!(hidden.as_key().starts_with("docs/a.pdf-disabled-"));
    /// assert_eq!(hidden.as_key().len(), "docs/a.pdf-disabled-".len() + 64);
    /// ```
    pub fn disabled_path(&self, path: &StoragePath) -> StoragePath {
        path.with_suffix(&format!("{}{}", DISABLED_MARKER, self.digest_hex(path)))
    }
}

impl fmt::Debug for DisabledFileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DisabledFileKey(<redacted>)")
    }
}

/// Strip the disabled suffix, if present, from a path.
pub fn path_from_disabled_path(path: &StoragePath) -> StoragePath {
    match path.as_key().find(DISABLED_MARKER) {
        Some(idx) => match StoragePath::parse(&path.as_key()[..idx]) {
            Ok(original) => original,
            Err(_) => path.clone(),
        },
        None => path.clone(),
    }
}

/// Whether `path` is a disabled-path rename.
pub fn is_disabled_path(path: &StoragePath) -> bool {
    path.file_name().contains(DISABLED_MARKER)
}
