//! Configuration module for Droplink.

use serde::Deserialize;
use std::path::Path;

use crate::{DropError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/droplink.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the blob storage directory.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "data/storage".to_string()
}

fn default_max_upload_size() -> u64 {
    2048
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

impl StorageConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

/// Share link configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// Time-to-live for share links, in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// Public base URL used to build share links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Length of generated share codes.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
}

fn default_ttl_hours() -> u64 {
    72
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_code_length() -> usize {
    7
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            base_url: default_base_url(),
            code_length: default_code_length(),
        }
    }
}

impl LinksConfig {
    /// Link TTL as a [`std::time::Duration`].
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_hours * 3600)
    }
}

/// Expiry sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Interval between sweep runs, in minutes.
    #[serde(default = "default_sweep_interval")]
    pub interval_minutes: u64,
}

fn default_sweep_interval() -> u64 {
    30
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_sweep_interval(),
        }
    }
}

impl SweepConfig {
    /// Sweep interval as a [`std::time::Duration`].
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_minutes * 60)
    }
}

/// Web middleware configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Allowed CORS origins. Empty means permissive (development mode).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve the static frontend.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to the static frontend files.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// General API rate limit (requests per minute per IP).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_serve_static() -> bool {
    false
}

fn default_static_path() -> String {
    "web/dist".to_string()
}

fn default_api_rate_limit() -> u32 {
    100
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            serve_static: default_serve_static(),
            static_path: default_static_path(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/droplink.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Share link configuration.
    #[serde(default)]
    pub links: LinksConfig,
    /// Expiry sweep configuration.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Web middleware configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DropError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DropError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DROPLINK_BASE_URL`: Override the public base URL for share links
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("DROPLINK_BASE_URL") {
            if !base_url.is_empty() {
                self.links.base_url = base_url;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.links.ttl_hours == 0 {
            return Err(DropError::Config(
                "links.ttl_hours must be at least 1".to_string(),
            ));
        }
        if self.links.code_length == 0 {
            return Err(DropError::Config(
                "links.code_length must be at least 1".to_string(),
            ));
        }
        if self.sweep.interval_minutes == 0 {
            return Err(DropError::Config(
                "sweep.interval_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
