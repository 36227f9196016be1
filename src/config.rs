//! Configuration module for Filedrop.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{FiledropError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all persisted state.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Blob directory, relative to `data_dir`.
    #[serde(default = "default_blob_dir")]
    pub blob_dir: String,
    /// Catalog document, relative to `data_dir`.
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_blob_dir() -> String {
    "uploads".to_string()
}

fn default_catalog_file() -> String {
    "files.json".to_string()
}

impl StorageConfig {
    /// Full path of the blob directory.
    pub fn blob_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.blob_dir)
    }

    /// Full path of the catalog document.
    pub fn catalog_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.catalog_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            blob_dir: default_blob_dir(),
            catalog_file: default_catalog_file(),
        }
    }
}

/// Upload limits.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum size of a single file in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
    /// Maximum number of files per upload request.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Accepted content types (MIME essence, parameters ignored).
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

fn default_max_file_size() -> u64 {
    50
}

fn default_max_files() -> usize {
    10
}

fn default_allowed_types() -> Vec<String> {
    [
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/pdf",
        "application/vnd.ms-excel",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "image/jpeg",
        "image/png",
        "text/plain",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl UploadConfig {
    /// Maximum size of a single file in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size(),
            max_files: default_max_files(),
            allowed_types: default_allowed_types(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty logs to stdout only.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filedrop.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload limits.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FiledropError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FiledropError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEDROP_HOST`: bind address
    /// - `FILEDROP_PORT`: listening port
    /// - `FILEDROP_DATA_DIR`: root directory for blobs and catalog
    /// - `FILEDROP_LOG_LEVEL`: log level
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(host) = non_empty_env("FILEDROP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty_env("FILEDROP_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| FiledropError::Config(format!("invalid FILEDROP_PORT: {port}")))?;
        }
        if let Some(dir) = non_empty_env("FILEDROP_DATA_DIR") {
            self.storage.data_dir = dir;
        }
        if let Some(level) = non_empty_env("FILEDROP_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - a size or count limit is zero
    /// - the allow-list is empty or holds something that is not a MIME type
    pub fn validate(&self) -> Result<()> {
        if self.upload.max_file_size_mb == 0 {
            return Err(FiledropError::Config(
                "upload.max_file_size_mb must be greater than 0".to_string(),
            ));
        }
        if self.upload.max_files == 0 {
            return Err(FiledropError::Config(
                "upload.max_files must be greater than 0".to_string(),
            ));
        }
        if self.upload.allowed_types.is_empty() {
            return Err(FiledropError::Config(
                "upload.allowed_types must not be empty".to_string(),
            ));
        }
        for entry in &self.upload.allowed_types {
            if entry.parse::<mime_guess::mime::Mime>().is_err() {
                return Err(FiledropError::Config(format!(
                    "upload.allowed_types: '{entry}' is not a MIME type"
                )));
            }
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
