//! # Host Configuration
//!
//! Settings are read from an optional TOML file. Every field has a default,
//! so an empty file is a valid configuration.
//!
//! ```toml
//! request_timeout_ms = 2000
//! log_filter = "margind=debug,info"
//! legacy_names = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// How long a content request waits for an answer
    pub request_timeout_ms: u64,
    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Print outbound messages with legacy names instead of typed names
    pub legacy_names: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            log_filter: "info".to_string(),
            legacy_names: false,
        }
    }
}

impl HostConfig {
    /// Parses a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: HostConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Timeout for correlated requests
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
