//! Configuration loading and management.

use crate::registry::BulkPolicy;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub builtins: BuiltinsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Registry behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    /// Collision handling for bulk registration.
    #[serde(default)]
    pub bulk_policy: BulkPolicy,
}

/// Base commands registered at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct BuiltinsConfig {
    #[serde(default = "default_builtins")]
    pub enabled: Vec<String>,
}

impl Default for BuiltinsConfig {
    fn default() -> Self {
        Self {
            enabled: default_builtins(),
        }
    }
}

fn default_builtins() -> Vec<String> {
    ["echo", "help", "ls", "sleep"].map(String::from).to_vec()
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
