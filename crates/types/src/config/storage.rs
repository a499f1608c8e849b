//! Storage configuration for the redb database holding counters and students.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Minimum cache size: 1 MB.
const MIN_CACHE_SIZE_BYTES: usize = 1024 * 1024;

/// Storage layer configuration.
///
/// # Validation Rules
///
/// - `path` must not be empty
/// - `cache_size_bytes` must be >= 1 MB (1,048,576 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StorageConfig {
    /// Database file. Created on first open.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// redb page cache size in bytes.
    #[serde(default = "default_cache_size")]
    pub cache_size_bytes: usize,
}

#[bon::bon]
impl StorageConfig {
    /// Creates a new storage configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `path` is empty or
    /// `cache_size_bytes` < 1 MB.
    #[builder]
    pub fn new(
        #[builder(default = default_path())] path: PathBuf,
        #[builder(default = default_cache_size())] cache_size_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { path, cache_size_bytes };
        config.validate()?;
        Ok(config)
    }
}

impl StorageConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: "storage path must not be empty".to_string(),
            });
        }
        if self.cache_size_bytes < MIN_CACHE_SIZE_BYTES {
            return Err(ConfigError::Validation {
                message: format!(
                    "cache_size_bytes must be >= {} (1 MB), got {}",
                    MIN_CACHE_SIZE_BYTES, self.cache_size_bytes
                ),
            });
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_path(), cache_size_bytes: default_cache_size() }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("exam-registry.redb")
}

fn default_cache_size() -> usize {
    64 * 1024 * 1024 // 64 MB
}
