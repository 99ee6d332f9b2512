//! Device configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use anthemav_protocol::{DEFAULT_PORT, MAX_ZONE};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};
use crate::reconnect::ReconnectConfig;

/// What happens to zone values when the connection drops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep last-known values until fresh telemetry arrives.
    #[default]
    Retain,
    /// Reset every zone to defaults on disconnect.
    Reset,
}

/// One configured zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub zone_number: u8,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
}

fn default_true() -> bool {
    true
}

impl ZoneConfig {
    /// Enabled zone with the default `Zone <n>` name.
    pub fn new(zone_number: u8) -> Self {
        Self {
            zone_number,
            enabled: true,
            name: format!("Zone {zone_number}"),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Configured name, falling back to `Zone <n>`.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Zone {}", self.zone_number)
        } else {
            self.name.clone()
        }
    }
}

/// Configuration of one receiver.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Stable identifier used as entity prefix.
    pub identifier: String,
    /// Human-readable device name.
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Model hint; replaced by the receiver's `IDM` answer once known.
    pub model: Option<String>,
    /// Bound on the TCP connect.
    pub timeout: Duration,
    /// Bound on a single command write.
    pub write_timeout: Duration,
    pub zones: Vec<ZoneConfig>,
    pub reconnect: ReconnectConfig,
    pub retention: RetentionPolicy,
}

impl DeviceConfig {
    /// Creates a configuration for `host` on the default port with zone 1.
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            identifier: Self::identifier_for(&host, DEFAULT_PORT),
            name: format!("Anthem ({host})"),
            host,
            port: DEFAULT_PORT,
            model: None,
            timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            zones: vec![ZoneConfig::new(1)],
            reconnect: ReconnectConfig::default(),
            retention: RetentionPolicy::default(),
        }
    }

    /// Builds the default identifier: `anthem_<host with dots as _>_<port>`.
    pub fn identifier_for(host: &str, port: u16) -> String {
        format!("anthem_{}_{port}", host.replace('.', "_"))
    }

    /// Builder: set the port. Also refreshes a derived identifier.
    pub fn with_port(mut self, port: u16) -> Self {
        if self.identifier == Self::identifier_for(&self.host, self.port) {
            self.identifier = Self::identifier_for(&self.host, port);
        }
        self.port = port;
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builder: set connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set per-command write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_zones(mut self, zones: Vec<ZoneConfig>) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Zone numbers that are configured and enabled, ascending.
    pub fn enabled_zones(&self) -> Vec<u8> {
        let zones: BTreeSet<u8> = self
            .zones
            .iter()
            .filter(|z| z.enabled)
            .map(|z| z.zone_number)
            .collect();
        zones.into_iter().collect()
    }

    /// Configured zone entry, if any.
    pub fn zone(&self, zone_number: u8) -> Option<&ZoneConfig> {
        self.zones.iter().find(|z| z.zone_number == zone_number)
    }

    /// Checks host, port, timeouts and zone numbering.
    pub fn validate(&self) -> DeviceResult<()> {
        if self.host.trim().is_empty() {
            return Err(DeviceError::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(DeviceError::config("port must not be 0"));
        }
        if self.identifier.trim().is_empty() {
            return Err(DeviceError::config("identifier must not be empty"));
        }
        if self.timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(DeviceError::config("timeouts must be greater than zero"));
        }
        if self.zones.is_empty() {
            return Err(DeviceError::config("at least one zone must be configured"));
        }

        let mut seen = BTreeSet::new();
        for zone in &self.zones {
            if zone.zone_number == 0 || zone.zone_number > MAX_ZONE {
                return Err(DeviceError::config(format!(
                    "zone {} out of range (1..={MAX_ZONE})",
                    zone.zone_number
                )));
            }
            if !seen.insert(zone.zone_number) {
                return Err(DeviceError::config(format!(
                    "zone {} configured twice",
                    zone.zone_number
                )));
            }
        }

        self.reconnect.validate()
    }
}
