//! Configuration management for qachat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{QaChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for qachat
///
/// This structure holds all configuration needed for the client,
/// including the server connection, local storage location, and
/// chat behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// QAChat server connection settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Local state storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat behavior settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// QAChat server connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base origin of the QAChat API server
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Timeout for non-streaming API requests (seconds)
    ///
    /// The chat stream is exempt: replies can take arbitrarily long to
    /// finish, so only request setup is bounded for it.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_origin() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Local state storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Data directory override (if None, the platform data dir is used)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Knowledge base id queried when none is selected explicitly
    #[serde(default = "default_kb_id")]
    pub default_kb_id: String,
}

fn default_kb_id() -> String {
    "0".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_kb_id: default_kb_id(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            chat: ChatConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QaChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| QaChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(origin) = std::env::var("QACHAT_SERVER_ORIGIN") {
            self.server.origin = origin;
        }

        if let Ok(timeout) = std::env::var("QACHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.server.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid QACHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(data_dir) = std::env::var("QACHAT_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(data_dir));
        }

        if let Ok(kb_id) = std::env::var("QACHAT_DEFAULT_KB") {
            self.chat.default_kb_id = kb_id;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(ref data_dir) = cli.data_dir {
            self.storage.data_dir = Some(data_dir.clone());
        }

        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Returns
    ///
    /// Returns Ok if configuration is valid
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.server.origin.is_empty() {
            return Err(QaChatError::Config("Server origin cannot be empty".to_string()).into());
        }

        let origin = url::Url::parse(&self.server.origin)
            .map_err(|e| QaChatError::Config(format!("Invalid server origin: {}", e)))?;

        if origin.scheme() != "http" && origin.scheme() != "https" {
            return Err(QaChatError::Config(format!(
                "Server origin must use http or https, got: {}",
                origin.scheme()
            ))
            .into());
        }

        if self.server.timeout_seconds == 0 {
            return Err(
                QaChatError::Config("timeout_seconds must be greater than 0".to_string()).into(),
            );
        }

        if self.server.timeout_seconds > 3600 {
            return Err(QaChatError::Config(
                "timeout_seconds must be less than or equal to 3600".to_string(),
            )
            .into());
        }

        if self.chat.default_kb_id.is_empty() {
            return Err(
                QaChatError::Config("chat.default_kb_id cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
