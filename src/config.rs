//! Configuration module
//!
//! Reads configuration from a TOML file (~/.config/echo-metrics/config.toml,
//! overridable via `ECHO_METRICS_CONFIG`). The configured ports are never used
//! directly: [`EffectiveConfig::derive`] produces the listen addresses by
//! adding a fixed offset, leaving the loaded config untouched.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::shared::errors::ConfigError;

/// Offset added to both configured ports when deriving listen addresses.
pub const PORT_OFFSET: u16 = 2;

/// Application configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

/// Server listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen host for both the service and the metrics listener
    pub host: String,
    /// Base service port
    pub port: u16,
    /// Base metrics port
    pub metrics_port: u16,
    /// Seconds to wait for in-flight requests when shutting down
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            metrics_port: 9090,
            shutdown_timeout: 30,
        }
    }
}

/// Echo service behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Upper bound for the simulated work interval, in milliseconds
    pub max_sleep_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { max_sleep_ms: 50 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter, overridable via `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: AppConfig = toml::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be positive".into()));
        }
        if self.server.metrics_port == 0 {
            return Err(ConfigError::Invalid(
                "server.metrics_port must be positive".into(),
            ));
        }
        if self.server.port == self.server.metrics_port {
            return Err(ConfigError::Invalid(
                "server.port and server.metrics_port must differ".into(),
            ));
        }
        for (field, port) in [
            ("server.port", self.server.port),
            ("server.metrics_port", self.server.metrics_port),
        ] {
            if port > u16::MAX - PORT_OFFSET {
                return Err(ConfigError::Invalid(format!(
                    "{field} leaves no room for the port offset ({PORT_OFFSET})"
                )));
            }
        }
        Ok(())
    }
}

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("echo-metrics")
        .join("config.toml")
}

/// Listen addresses derived from an [`AppConfig`].
///
/// Both ports are shifted by [`PORT_OFFSET`]; the source config is not
/// modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
}

impl EffectiveConfig {
    pub fn derive(cfg: &AppConfig) -> Self {
        Self {
            host: cfg.server.host.clone(),
            port: cfg.server.port + PORT_OFFSET,
            metrics_port: cfg.server.metrics_port + PORT_OFFSET,
        }
    }

    pub fn service_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.host, self.metrics_port)
    }
}
