use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::provider::{ConfigValue, ConnectionConfig, Masked};

/// Public GitHub API endpoint used when no `base_url` is configured
pub const DEFAULT_BASE_URL: &str = "https://api.github.com/";

/// Provider configuration file for githubrepos
#[derive(Deserialize, Serialize, Clone)]
pub struct Config {
    /// OAuth token used to connect to GitHub (falls back to GITHUB_TOKEN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Organization whose repositories are tracked (falls back to GITHUB_OWNER)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// GitHub API endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_deref().map(Masked))
            .field("owner", &self.owner)
            .field("base_url", &self.base_url)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String, // "compact", "pretty", "full"

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            base_url: default_base_url(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the default location, or fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!("No configuration at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("githubrepos").join("config.yml"))
    }

    /// Build the connection inputs for the resolver.
    ///
    /// Values are expanded against the process environment. A value referring to a
    /// variable that is not set cannot be evaluated yet and becomes
    /// [`ConfigValue::Unknown`].
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            token: expand_value(self.token.as_deref()),
            owner: expand_value(self.owner.as_deref()),
            base_url: Some(self.base_url.clone()),
        }
    }
}

fn expand_value(raw: Option<&str>) -> ConfigValue {
    match raw {
        None => ConfigValue::Null,
        Some(raw) => match shellexpand::env(raw) {
            Ok(expanded) => ConfigValue::Known(expanded.into_owned()),
            Err(e) => {
                tracing::debug!("Deferring configuration value: {}", e);
                ConfigValue::Unknown
            }
        },
    }
}
