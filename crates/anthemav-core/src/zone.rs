//! Per-zone state record.

use serde::{Deserialize, Serialize};

use crate::volume::MIN_VOLUME_DB;

/// Placeholder for telemetry the receiver has not reported yet.
pub const UNKNOWN: &str = "Unknown";

/// Last known state of one zone.
///
/// Only the fold step in [`DeviceState`](crate::DeviceState) writes to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneState {
    pub power: bool,
    /// Always within `[-90, 0]`.
    pub volume_db: i32,
    pub muted: bool,
    pub input_number: u32,
    pub input_name: String,
    pub audio_format: String,
    pub audio_channels: String,
    pub video_resolution: String,
    pub listening_mode: String,
    pub sample_rate: String,
    pub bit_depth: String,
}

impl Default for ZoneState {
    fn default() -> Self {
        Self {
            power: false,
            volume_db: MIN_VOLUME_DB,
            muted: false,
            input_number: 1,
            input_name: UNKNOWN.to_string(),
            audio_format: UNKNOWN.to_string(),
            audio_channels: UNKNOWN.to_string(),
            video_resolution: UNKNOWN.to_string(),
            listening_mode: UNKNOWN.to_string(),
            sample_rate: UNKNOWN.to_string(),
            bit_depth: UNKNOWN.to_string(),
        }
    }
}

impl ZoneState {
    /// Creates a zone with every field at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Volume as a percentage of the receiver's range.
    pub fn volume_percent(&self) -> f64 {
        crate::volume::db_to_percentage(self.volume_db)
    }

    /// Returns true once any sensor telemetry has been reported.
    pub fn has_telemetry(&self) -> bool {
        [
            &self.audio_format,
            &self.audio_channels,
            &self.video_resolution,
            &self.listening_mode,
            &self.sample_rate,
            &self.bit_depth,
        ]
        .iter()
        .any(|v| v.as_str() != UNKNOWN)
    }
}
