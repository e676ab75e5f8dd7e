//! Configuration management for docsync
//!
//! Configuration is read from a TOML file and completed with built-in
//! defaults. Command-line arguments are applied on top by the CLI layer.
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file (`--config`, else `~/.docsync/config.toml`)
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Push and pull tuning
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database holding the collections
    #[serde(default = "default_database")]
    pub database: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum pool size
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    /// Minimum pool size
    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: u32,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// Push and pull configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferConfig {
    /// Maximum documents per bulk commit
    #[serde(default = "default_bulk_size")]
    pub bulk_size: usize,

    /// Documents per pull query
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Pause before retrying a failed pull query, in seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Retries allowed at one offset; unset retries forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_query_retries: Option<u32>,

    /// Default source directory for push
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Default destination directory for pull
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Show a throughput spinner while pushing
    #[serde(default = "default_progress_bar")]
    pub progress_bar: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "docsync".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_min_pool_size() -> u32 {
    0
}

fn default_app_name() -> String {
    "docsync".to_string()
}

fn default_bulk_size() -> usize {
    100
}

fn default_page_size() -> u64 {
    100
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("upload")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("download")
}

fn default_progress_bar() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            timeout: default_timeout(),
            max_pool_size: default_max_pool_size(),
            min_pool_size: default_min_pool_size(),
            app_name: default_app_name(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            bulk_size: default_bulk_size(),
            page_size: default_page_size(),
            retry_delay_secs: default_retry_delay_secs(),
            max_query_retries: None,
            upload_dir: default_upload_dir(),
            download_dir: default_download_dir(),
            progress_bar: default_progress_bar(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::Generic(format!("{}: {}", path.display(), e))
            }
        })?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load the configuration used by a run
    ///
    /// An explicit path must exist. Without one, the default path is read
    /// when present and defaults are used otherwise.
    ///
    /// # Arguments
    /// * `path` - Optional explicit configuration file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Self::default_path();
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docsync")
            .join("config.toml")
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Generic(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        self.connection.validate_uri()?;

        if self.connection.timeout == 0 {
            return Err(invalid("connection.timeout", "0"));
        }
        if self.connection.min_pool_size > self.connection.max_pool_size {
            return Err(invalid(
                "connection.min_pool_size",
                &format!(
                    "{} (greater than max_pool_size {})",
                    self.connection.min_pool_size, self.connection.max_pool_size
                ),
            ));
        }
        if self.connection.database.is_empty() {
            return Err(invalid("connection.database", "\"\""));
        }
        if self.transfer.bulk_size == 0 {
            return Err(invalid("transfer.bulk_size", "0"));
        }
        if self.transfer.page_size == 0 {
            return Err(invalid("transfer.page_size", "0"));
        }
        if self.transfer.retry_delay_secs == 0 {
            return Err(invalid("transfer.retry_delay_secs", "0"));
        }
        Ok(())
    }

    /// Get the pull retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.transfer.retry_delay_secs)
    }
}

fn invalid(field: &str, value: &str) -> crate::error::SyncError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl ConnectionConfig {
    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Check the connection URI scheme
    ///
    /// # Returns
    /// * `Result<()>` - Ok if URI is valid, error otherwise
    pub fn validate_uri(&self) -> Result<()> {
        if self.uri.starts_with("mongodb://") || self.uri.starts_with("mongodb+srv://") {
            Ok(())
        } else {
            Err(invalid("connection.uri", &self.uri))
        }
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.uri, "mongodb://localhost:27017");
        assert_eq!(config.connection.database, "docsync");
        assert_eq!(config.transfer.bulk_size, 100);
        assert_eq!(config.transfer.page_size, 100);
        assert_eq!(config.transfer.max_query_retries, None);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [transfer]
            bulk_size = 500
            max_query_retries = 3

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.transfer.bulk_size, 500);
        assert_eq!(config.transfer.page_size, 100);
        assert_eq!(config.transfer.max_query_retries, Some(3));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.connection, ConnectionConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[transfer\nbulk_size = 1").unwrap_err();
        assert!(matches!(err, SyncError::Config(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[connection]\ndatabase = \"archive\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.connection.database, "archive");
    }

    #[test]
    fn test_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, SyncError::Config(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.transfer.max_query_retries = Some(5);
        let rendered = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&rendered).unwrap(), config);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.transfer.bulk_size = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.transfer.page_size = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.connection.timeout = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.transfer.retry_delay_secs = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.connection.min_pool_size = 20;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.connection.uri = "http://localhost".to_string();
        assert_err!(config.validate());

        let mut config = Config::default();
        config.connection.uri = "mongodb+srv://cluster.example.net".to_string();
        assert_ok!(config.validate());
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.connection.connection_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_delay(), Duration::from_secs(10));
    }
}
