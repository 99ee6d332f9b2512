//! Typed messages produced by the wire parser.
//!
//! Every line the receiver sends that the parser understands becomes exactly
//! one [`ParsedMessage`]. Messages are transient: they are folded into a
//! [`DeviceState`](crate::DeviceState) and then dropped.

use serde::{Deserialize, Serialize};

/// One parsed line from the receiver.
///
/// Zone-scoped variants carry the zone number exactly as it appeared after
/// the `Z` prefix of the source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedMessage {
    /// Device model name (`IDM`).
    SystemModel { model: String },
    /// Number of configured inputs (`ICN`).
    InputCount { count: u32 },
    /// Receiver-defined input name (`IS<n>IN`).
    InputName { input_number: u32, name: String },
    /// Zone power state (`Z<n>POW`).
    ZonePower { zone: u8, is_on: bool },
    /// Zone volume in dB (`Z<n>VOL`).
    ZoneVolume { zone: u8, volume_db: i32 },
    /// Zone mute state (`Z<n>MUT`).
    ZoneMute { zone: u8, is_muted: bool },
    /// Zone input selection (`Z<n>INP`).
    ZoneInput { zone: u8, input_number: u32 },
    /// Audio input format (`Z<n>AIF`).
    ZoneAudioFormat { zone: u8, format: String },
    /// Audio input channels (`Z<n>AIC`).
    ZoneAudioChannels { zone: u8, channels: String },
    /// Video input resolution (`Z<n>VIR`).
    ZoneVideoResolution { zone: u8, resolution: String },
    /// Active listening mode (`Z<n>ALM`).
    ZoneListeningMode {
        zone: u8,
        mode_number: u32,
        mode_name: String,
    },
    /// Full sample rate description (`Z<n>AIR`).
    ZoneSampleRateInfo { zone: u8, info: String },
    /// Sample rate in kHz (`Z<n>SRT`).
    ZoneSampleRate { zone: u8, rate_khz: u32 },
    /// Bit depth (`Z<n>BDP`).
    ZoneBitDepth { zone: u8, depth: u32 },
}

impl ParsedMessage {
    /// Returns the zone this message refers to, or `None` for system messages.
    pub fn zone(&self) -> Option<u8> {
        match self {
            Self::SystemModel { .. } | Self::InputCount { .. } | Self::InputName { .. } => None,
            Self::ZonePower { zone, .. }
            | Self::ZoneVolume { zone, .. }
            | Self::ZoneMute { zone, .. }
            | Self::ZoneInput { zone, .. }
            | Self::ZoneAudioFormat { zone, .. }
            | Self::ZoneAudioChannels { zone, .. }
            | Self::ZoneVideoResolution { zone, .. }
            | Self::ZoneListeningMode { zone, .. }
            | Self::ZoneSampleRateInfo { zone, .. }
            | Self::ZoneSampleRate { zone, .. }
            | Self::ZoneBitDepth { zone, .. } => Some(*zone),
        }
    }
}
