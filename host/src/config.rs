//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: where the http api listens.
//!     - SensorConfig: which dht11 driver to use and on which GPIO pin.
//!     - HistoryConfig: how many readings the in-memory history keeps.
//!     - LedConfig: the optional on/off status led.
//!     - TelemetryConfig: optional push to a remote realtime database.
//!     - LoggingConfig: log level and whether to log every reading.
//!
//! every section and field is optional; missing ones take the defaults below.
//!
//! ==============================================================================

use crate::buffer::DEFAULT_CAPACITY;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub server: ServerConfig,
    pub sensor: SensorConfig,
    pub history: HistoryConfig,
    pub led: LedConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorDriver {
    Dht11,
    Mock,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConfig {
    pub driver: SensorDriver,
    pub gpio_pin: u8,
    /// interpreter used by the dht11 driver
    pub python: String,
    /// mock driver only: fail every n-th read (0 = never)
    pub mock_fail_every: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LedConfig {
    pub enabled: bool,
    pub gpio_pin: u8,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub database_url: String,
    pub auth_token: Option<String>,
    /// database node the reading is written to
    pub path: String,
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:5000".to_string() }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            driver: SensorDriver::Dht11,
            gpio_pin: 4,
            python: "python3".to_string(),
            mock_fail_every: 0,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

impl Default for LedConfig {
    fn default() -> Self {
        Self { enabled: false, gpio_pin: 17 }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database_url: String::new(),
            auth_token: None,
            path: "sensor_data".to_string(),
            interval_seconds: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file: {}", e))?;
        Self::parse(&content)
    }

    /// Parse and validate a toml document
    pub fn parse(content: &str) -> Result<Self> {
        let config: HostConfig = toml::from_str(content)
            .map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("host.toml"),
            std::path::PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("[CONFIG] Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::warn!("[CONFIG] No config file found - using defaults");
        Self::default()
    }

    /// Reject values the host cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.history.capacity == 0 {
            return Err(anyhow!("history.capacity must be at least 1"));
        }
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow!("server.bind is not a socket address: {}", self.server.bind));
        }
        if self.telemetry.enabled {
            if self.telemetry.database_url.trim().is_empty() {
                return Err(anyhow!("telemetry.database_url is required when telemetry is enabled"));
            }
            if self.telemetry.interval_seconds == 0 {
                return Err(anyhow!("telemetry.interval_seconds must be at least 1"));
            }
        }
        Ok(())
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!("┌─────────────────────────────────────────┐");
        tracing::info!("│           HOST CONFIGURATION            │");
        tracing::info!("├─────────────────────────────────────────┤");
        tracing::info!("│ Bind: {}", self.server.bind);
        tracing::info!("│ Sensor: {:?} on GPIO {}", self.sensor.driver, self.sensor.gpio_pin);
        tracing::info!("│ History: {} readings", self.history.capacity);
        tracing::info!("│ LED: {}", if self.led.enabled { "enabled" } else { "disabled" });
        tracing::info!("│ Telemetry: {}", if self.telemetry.enabled { "enabled" } else { "disabled" });
        tracing::info!("│ Log Level: {}", self.logging.level);
        tracing::info!("└─────────────────────────────────────────┘");
    }
}
