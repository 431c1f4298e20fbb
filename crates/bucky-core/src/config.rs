//! Configuration management for bucky.
//!
//! Configuration is read from an optional TOML file. Every field has a default,
//! and command line flags override file values after loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Prefix of carbon's own self-monitoring metrics.
pub const DEFAULT_HOUSEKEEPING_PREFIX: &str = "carbon.agents.";

/// Main configuration for the bucky CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Daemon client configuration.
    pub client: ClientConfig,
    /// Sync executor configuration.
    pub sync: SyncSettings,
    /// Metric catalog configuration.
    pub catalog: CatalogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(crate::Error::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Load configuration from `path`, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Checks values that cannot be expressed by the types alone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> crate::Result<()> {
        if self.sync.workers == 0 {
            return Err(crate::Error::Config("sync.workers must be at least 1".to_string()));
        }
        if self.catalog.exclude_housekeeping && self.catalog.housekeeping_prefix.is_empty() {
            return Err(crate::Error::Config(
                "catalog.housekeeping_prefix must not be empty when exclusion is enabled"
                    .to_string(),
            ));
        }
        if self.client.timeout_secs == 0 {
            return Err(crate::Error::Config("client.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Settings for talking to storage node daemons.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout for a single HTTP request, in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Sync executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Number of concurrent transfer workers.
    pub workers: usize,
    /// Log planned transfers without performing them.
    pub dry_run: bool,
    /// Treat a missing source metric as a skip instead of a failure.
    pub ignore_missing_source: bool,
    /// Delete the source metric after a successful copy.
    pub delete_source: bool,
    /// Timeout for one metric transfer, in seconds.
    pub transfer_timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            dry_run: false,
            ignore_missing_source: false,
            delete_source: false,
            transfer_timeout_secs: 600,
        }
    }
}

/// Metric catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Ask daemons to rebuild their metric cache before listing.
    pub force_rebuild: bool,
    /// Skip housekeeping metrics during consistency checks.
    pub exclude_housekeeping: bool,
    /// Name prefix identifying housekeeping metrics.
    pub housekeeping_prefix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            force_rebuild: false,
            exclude_housekeeping: false,
            housekeeping_prefix: DEFAULT_HOUSEKEEPING_PREFIX.to_string(),
        }
    }
}
