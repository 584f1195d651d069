//! Bridge configuration.
//!
//! Configuration is a single JSON document. Every field has a default so a
//! file only needs to name what differs, e.g.
//!
//! ```json
//! { "connection": { "url": "http://openhab:8080", "user": "rules" } }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub general: GeneralConfig,
    pub executor: ExecutorConfig,
    pub ping: PingConfig,
}

/// Peer endpoint and reconnect settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Base URL of the peer. Empty means unconfigured.
    pub url: String,
    pub user: String,
    pub password: String,
    pub verify_ssl: bool,
    /// Maximum length of a single SSE line in bytes.
    pub buffer_size: usize,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_factor: f64,
    /// Treat any status >= 400 on the handshake probe as "not ready".
    pub expect_success_on_probe: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            verify_ssl: true,
            buffer_size: 512 * 1024,
            min_backoff_ms: 1_000,
            max_backoff_ms: 32_000,
            backoff_factor: 2.0,
            expect_success_on_probe: true,
        }
    }
}

impl ConnectionConfig {
    /// Config pointing at `url` with all other settings defaulted.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub fn has_credentials(&self) -> bool {
        !self.user.is_empty() || !self.password.is_empty()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }

    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Read-only mode: mutating requests are suppressed.
    pub listen_only: bool,
}

/// Callback worker pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub worker_threads: usize,
    /// Warn when a sync callback waits longer than this for a worker.
    pub slow_start_ms: u64,
    /// Warn when a sync callback runs longer than this.
    pub slow_exec_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: 10,
            slow_start_ms: 50,
            slow_exec_ms: 800,
        }
    }
}

impl ExecutorConfig {
    pub fn slow_start(&self) -> Duration {
        Duration::from_millis(self.slow_start_ms)
    }

    pub fn slow_exec(&self) -> Duration {
        Duration::from_millis(self.slow_exec_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    pub enabled: bool,
    pub item: String,
    pub interval_secs: u64,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            item: "HABApp_Ping".to_string(),
            interval_secs: 10,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/rulebridge/config.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("rulebridge").join("config.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.worker_threads == 0 {
            return Err(ConfigError::Invalid(
                "executor.worker_threads must be greater than 0".to_string(),
            ));
        }
        let conn = &self.connection;
        if conn.min_backoff_ms > conn.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "connection.min_backoff_ms ({}) exceeds max_backoff_ms ({})",
                conn.min_backoff_ms, conn.max_backoff_ms
            )));
        }
        if conn.backoff_factor.is_nan() || conn.backoff_factor < 1.0 {
            return Err(ConfigError::Invalid(
                "connection.backoff_factor must be at least 1.0".to_string(),
            ));
        }
        if conn.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "connection.buffer_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
