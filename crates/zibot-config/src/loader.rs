//! Configuration loading utilities

use crate::Config;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use zibot_common::ZiError;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_VAR: &str = "ZIBOT_CONFIG_PATH";

/// Files probed, in order, when no path is given.
const DEFAULT_CONFIG_FILES: [&str; 3] = ["config.yaml", "config.yml", "config.toml"];

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Unknown file extension
    #[error("Unsupported configuration format: '{0}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {message}")]
    EnvParseError {
        /// Variable name
        var: String,
        /// What was wrong with it
        message: String,
    },

    /// Configuration validation error
    #[error(transparent)]
    Invalid(#[from] ZiError),
}

impl From<ConfigError> for ZiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(inner) => inner,
            other => Self::config(other.to_string()),
        }
    }
}

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML or TOML file with environment variable overrides
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());

        let mut config = Self::parse_file(path)?;
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from the path in `ZIBOT_CONFIG_PATH`, a default file, or defaults
    pub fn load() -> Result<Config, ConfigError> {
        if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            return Self::load_config(config_path);
        }

        if let Some(path) = DEFAULT_CONFIG_FILES.iter().find(|p| Path::new(p).exists()) {
            return Self::load_config(path);
        }

        debug!("No configuration file found, using defaults");
        let mut config = Config::default();
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without applying overrides or validation
    pub fn parse_file(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
            "toml" => Ok(toml::from_str(&content)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
        Self::apply_overrides_from(config, |var| env::var(var).ok())
    }

    /// Apply overrides using a custom variable lookup
    pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN") {
            config.discord.token = token;
        }

        if let Some(prefixes) = lookup("ZIBOT_PREFIXES") {
            config.discord.prefixes = prefixes
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(level) = lookup("ZIBOT_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(timeout) = lookup("ZIBOT_PAGING_TIMEOUT") {
            config.paging.inactivity_timeout_seconds =
                timeout.parse().map_err(|e: std::num::ParseIntError| ConfigError::EnvParseError {
                    var: "ZIBOT_PAGING_TIMEOUT".to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }
}
