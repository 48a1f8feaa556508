//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::engine::EngineConfig;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Instance-level default query settings, merged under every query's
    /// own settings (the query wins on collision).
    #[serde(default)]
    pub query: Map<String, Value>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_query_path")]
    pub query_path: String,

    #[serde(default)]
    pub basic_auth_user: Option<String>,

    #[serde(default)]
    pub basic_auth_password: Option<String>,

    #[serde(default)]
    pub skip_tls_verify: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_wait_min")]
    pub retry_wait_min_ms: u64,

    #[serde(default = "default_retry_wait_max")]
    pub retry_wait_max_ms: u64,
}

fn default_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_query_path() -> String {
    "/query".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_wait_min() -> u64 {
    500
}

fn default_retry_wait_max() -> u64 {
    5_000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            query_path: default_query_path(),
            basic_auth_user: None,
            basic_auth_password: None,
            skip_tls_verify: false,
            request_timeout_ms: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_wait_min_ms: default_retry_wait_min(),
            retry_wait_max_ms: default_retry_wait_max(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Initialize the global tracing subscriber.
    ///
    /// `RUST_LOG` wins over the configured level. Safe to call only once
    /// per process.
    pub fn init(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("tessera={}", self.level).into());

        let registry = tracing_subscriber::registry().with(filter);
        if self.format == "json" {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        } else {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tessera").join("config.toml")),
            Some(PathBuf::from("/etc/tessera/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TESSERA_ENGINE_URL") {
            self.connection.url = url;
        }
        if let Ok(user) = std::env::var("TESSERA_ENGINE_USER") {
            self.connection.basic_auth_user = Some(user);
        }
        if let Ok(password) = std::env::var("TESSERA_ENGINE_PASSWORD") {
            self.connection.basic_auth_password = Some(password);
        }
        if let Ok(timeout) = std::env::var("TESSERA_ENGINE_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.connection.request_timeout_ms = t;
            }
        }
        if let Ok(level) = std::env::var("TESSERA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TESSERA_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Engine client configuration derived from the connection section.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            base_url: self.connection.url.clone(),
            query_path: self.connection.query_path.clone(),
            basic_auth_user: self.connection.basic_auth_user.clone(),
            basic_auth_password: self.connection.basic_auth_password.clone(),
            skip_tls_verify: self.connection.skip_tls_verify,
            request_timeout_ms: self.connection.request_timeout_ms,
            max_retries: self.connection.max_retries,
            retry_wait_min_ms: self.connection.retry_wait_min_ms,
            retry_wait_max_ms: self.connection.retry_wait_max_ms,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}
