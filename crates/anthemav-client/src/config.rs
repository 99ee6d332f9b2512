//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/anthemav/config.toml` by default:
//!
//! ```toml
//! [device]
//! host = "192.168.1.50"
//! port = 14999
//! retention = "retain"
//!
//! [[device.zones]]
//! zone_number = 1
//! name = "Living Room"
//!
//! [reconnect]
//! initial_backoff_ms = 1000
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anthemav_core::{TracingConfig, TracingOutputFormat};
use anthemav_device::{DeviceConfig, ReconnectConfig, RetentionPolicy, ZoneConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the anthemav client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Receiver settings.
    pub device: DeviceSettings,

    /// Reconnect backoff settings.
    pub reconnect: ReconnectSettings,

    /// Log output settings.
    pub logging: LoggingSettings,
}

/// Receiver connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Host name or address of the receiver.
    pub host: Option<String>,

    pub port: u16,

    /// Friendly name; defaults to `Anthem (<host>)`.
    pub name: Option<String>,

    /// Entity identifier; defaults to `anthem_<host>_<port>`.
    pub identifier: Option<String>,

    /// Connect timeout in seconds.
    pub timeout: u64,

    /// Command write timeout in seconds.
    pub write_timeout: u64,

    /// Keep or reset zone values when the connection drops.
    pub retention: RetentionPolicy,

    pub zones: Vec<ZoneConfig>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: anthemav_protocol::DEFAULT_PORT,
            name: None,
            identifier: None,
            timeout: 10,
            write_timeout: 5,
            retention: RetentionPolicy::default(),
            zones: vec![ZoneConfig::new(1)],
        }
    }
}

/// Reconnect backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
    pub jitter: f64,
    /// Stop retrying after this many failures; unlimited when absent.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let defaults = ReconnectConfig::default();
        Self {
            initial_backoff_ms: defaults.initial_backoff.as_millis() as u64,
            max_backoff_ms: defaults.max_backoff.as_millis() as u64,
            multiplier: defaults.multiplier,
            jitter: defaults.jitter_fraction,
            max_attempts: defaults.max_attempts,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level for the anthemav crates (`error` .. `trace`).
    pub level: String,

    /// `pretty`, `compact` or `json`.
    pub format: String,

    /// Full filter directive; overrides `level`.
    pub filter: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            filter: None,
        }
    }
}

impl LoggingSettings {
    /// Tracing configuration for these settings.
    pub fn tracing_config(&self) -> Result<TracingConfig, String> {
        let format: TracingOutputFormat = self.format.parse().map_err(|e| format!("{}", e))?;
        let mut config = TracingConfig::default()
            .with_level_name(&self.level)
            .map_err(|e| format!("{}", e))?
            .with_format(format);
        if let Some(ref filter) = self.filter {
            config = config.with_env_filter(filter.clone());
        }
        Ok(config)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("anthemav")
    }

    /// Builds the device configuration, applying CLI overrides.
    pub fn device_config(
        &self,
        host: Option<&str>,
        port: Option<u16>,
    ) -> Result<DeviceConfig, String> {
        let device = &self.device;
        let host = host
            .map(str::to_string)
            .or_else(|| device.host.clone())
            .ok_or_else(|| {
                format!(
                    "no receiver host configured (use --host or set device.host in {})",
                    Self::default_path().display()
                )
            })?;

        let reconnect = &self.reconnect;
        let mut config = DeviceConfig::new(host)
            .with_port(port.unwrap_or(device.port))
            .with_timeout(Duration::from_secs(device.timeout))
            .with_write_timeout(Duration::from_secs(device.write_timeout))
            .with_zones(device.zones.clone())
            .with_retention(device.retention)
            .with_reconnect(
                ReconnectConfig::default()
                    .with_backoff(
                        Duration::from_millis(reconnect.initial_backoff_ms),
                        Duration::from_millis(reconnect.max_backoff_ms),
                        reconnect.multiplier,
                    )
                    .with_jitter(reconnect.jitter)
                    .with_max_attempts(reconnect.max_attempts),
            );

        if let Some(ref name) = device.name {
            config = config.with_name(name.clone());
        }
        if let Some(ref identifier) = device.identifier {
            config = config.with_identifier(identifier.clone());
        }

        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}
