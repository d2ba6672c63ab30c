//! Configuration management for threadkeeper

use crate::error::{Result, ThreadError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage settings
    pub storage: StorageConfig,
    /// Comment settings
    pub comments: CommentConfig,
    /// Listing settings
    pub listing: ListingConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| ThreadError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| e.with_context(format!("Failed to load {}", path.display())))
    }

    /// Load from `path` when it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ThreadError::Toml(e.to_string()))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.comments.max_length == 0 {
            return Err(ThreadError::Config(
                "comments.max_length must be greater than zero".to_string(),
            ));
        }
        if self.listing.max_limit == 0 {
            return Err(ThreadError::Config(
                "listing.max_limit must be greater than zero".to_string(),
            ));
        }
        if self.listing.default_limit == 0 || self.listing.default_limit > self.listing.max_limit
        {
            return Err(ThreadError::Config(format!(
                "listing.default_limit must be between 1 and {}",
                self.listing.max_limit
            )));
        }
        Ok(())
    }
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory (platform default when unset)
    pub data_dir: Option<PathBuf>,
    /// How long a writer waits for the write lock, in milliseconds
    pub lock_timeout_ms: u64,
}

impl StorageConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            lock_timeout_ms: 5000,
        }
    }
}

/// Comment-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentConfig {
    /// Maximum comment content length
    pub max_length: usize,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self { max_length: 10000 }
    }
}

/// Listing-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Top-level threads per page when the caller gives no limit
    pub default_limit: usize,
    /// Upper bound for a caller-supplied limit
    pub max_limit: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when no -v flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
