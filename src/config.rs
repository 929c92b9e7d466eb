//! Configuration module
//!
//! The gateway reads a single TOML file. Every section and every key is
//! optional; anything left out falls back to the defaults below.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [gateway]
//! heartbeat_interval = 300
//! command_timeout = 30
//!
//! [pricing]
//! pea_per_kwh = "4.50"
//! solar_per_kwh = "3.80"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory name under the platform config dir.
const APP_DIR: &str = "ev-gateway";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub gateway: GatewayConfig,
    pub pricing: PricingConfig,
    pub settlement: SettlementConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// WebSocket listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for background tasks during shutdown.
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://./ev-gateway.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// Protocol timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Heartbeat interval handed to stations in BootNotification, in seconds.
    pub heartbeat_interval: u32,
    /// A station silent for `heartbeat_interval * heartbeat_grace_multiplier`
    /// seconds is marked offline.
    pub heartbeat_grace_multiplier: u32,
    /// How often the heartbeat monitor runs, in seconds.
    pub monitor_interval: u64,
    /// Seconds an outbound command waits for its response.
    pub command_timeout: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: 300,
            heartbeat_grace_multiplier: 2,
            monitor_interval: 60,
            command_timeout: 30,
        }
    }
}

impl GatewayConfig {
    pub fn heartbeat_grace(&self) -> Duration {
        Duration::from_secs(
            u64::from(self.heartbeat_interval) * u64::from(self.heartbeat_grace_multiplier.max(1)),
        )
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }
}

/// Fallback tariffs used when no active price row exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub pea_per_kwh: Decimal,
    pub solar_per_kwh: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            pea_per_kwh: Decimal::new(450, 2),
            solar_per_kwh: Decimal::new(380, 2),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Close a transaction as `faulted` when the wallet cannot cover it,
    /// instead of leaving it open for a retry.
    pub fault_on_insufficient_balance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Address of the Prometheus scrape endpoint.
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "0.0.0.0:9100".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`. A missing file yields the defaults;
    /// `DATABASE_URL` overrides the configured database URL.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                config.database.url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.heartbeat_interval == 0 {
            return Err(ConfigError::Invalid(
                "gateway.heartbeat_interval must be positive".into(),
            ));
        }
        if self.gateway.command_timeout == 0 {
            return Err(ConfigError::Invalid(
                "gateway.command_timeout must be positive".into(),
            ));
        }
        if self.pricing.pea_per_kwh.is_sign_negative() || self.pricing.solar_per_kwh.is_sign_negative() {
            return Err(ConfigError::Invalid("pricing must not be negative".into()));
        }
        Ok(())
    }
}

/// `$OCPP_CONFIG`, or `<config dir>/ev-gateway/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("OCPP_CONFIG") {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}
