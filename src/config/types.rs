//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::accounts::AccountsConfig;
use super::history::HistoryConfig;
use super::limits::LimitsConfig;
use super::multiclient::MulticlientConfig;
use super::validation::{ValidationError, validate};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server identity.
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity limits (nick length, WHOWAS, MONITOR).
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Account-related nickname policy.
    #[serde(default)]
    pub accounts: AccountsConfig,
    /// Bouncer (multiple sessions per client) policy.
    #[serde(default)]
    pub multiclient: MulticlientConfig,
    /// History buffer sizing.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Log filter and output format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Run [`validate`] and wrap any findings in [`ConfigError::Invalid`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate(self).map_err(ConfigError::Invalid)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name used as the prefix of numeric replies (e.g., "irc.straylight.net").
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Network name (e.g., "Straylight").
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            network: default_network(),
        }
    }
}

fn default_server_name() -> String {
    "irc.straylight.net".to_string()
}

fn default_network() -> String {
    "Straylight".to_string()
}

/// Logging configuration.
///
/// `RUST_LOG` takes precedence over `level` when set.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_true() -> bool {
    true
}
