//! Session-level state and the fold step.
//!
//! [`DeviceState::fold`] is the only way parsed messages change state. It
//! always reports the field a message addressed, even when the stored value
//! did not change; callers emit on every fold.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::ParsedMessage;
use crate::tables;
use crate::volume::clamp_db;
use crate::zone::{UNKNOWN, ZoneState};

/// Logical field addressed by a parsed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Power,
    Volume,
    Muted,
    Input,
    AudioFormat,
    AudioChannels,
    VideoResolution,
    ListeningMode,
    SampleRate,
    BitDepth,
    Model,
    InputCount,
    InputName,
}

impl Field {
    /// Snake-case name used in entity identifiers and attribute maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Volume => "volume",
            Self::Muted => "muted",
            Self::Input => "input",
            Self::AudioFormat => "audio_format",
            Self::AudioChannels => "audio_channels",
            Self::VideoResolution => "video_resolution",
            Self::ListeningMode => "listening_mode",
            Self::SampleRate => "sample_rate",
            Self::BitDepth => "bit_depth",
            Self::Model => "model",
            Self::InputCount => "input_count",
            Self::InputName => "input_name",
        }
    }

    /// Read-only audio/video format telemetry.
    pub fn is_sensor(&self) -> bool {
        matches!(
            self,
            Self::AudioFormat
                | Self::AudioChannels
                | Self::VideoResolution
                | Self::ListeningMode
                | Self::SampleRate
                | Self::BitDepth
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of folding one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldOutcome {
    /// Zone affected, `None` for session-level messages.
    pub zone: Option<u8>,
    /// Field the message addressed.
    pub field: Field,
}

/// Everything known about one receiver.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    /// Model reported by `IDM`.
    pub model: Option<String>,
    /// Input count reported by `ICN`.
    pub input_count: Option<u32>,
    /// Receiver-defined input names keyed by input number.
    pub input_names: BTreeMap<u32, String>,
    /// When the last message was folded.
    pub last_message_at: Option<DateTime<Utc>>,
    zones: BTreeMap<u8, ZoneState>,
}

impl DeviceState {
    /// Creates a state tracking the given zones from the start.
    pub fn new(zones: impl IntoIterator<Item = u8>) -> Self {
        Self {
            zones: zones.into_iter().map(|z| (z, ZoneState::default())).collect(),
            ..Default::default()
        }
    }

    /// Returns a zone's state if it has been configured or seen on the wire.
    pub fn zone(&self, zone: u8) -> Option<&ZoneState> {
        self.zones.get(&zone)
    }

    /// Iterates over all tracked zones in ascending order.
    pub fn zones(&self) -> impl Iterator<Item = (u8, &ZoneState)> {
        self.zones.iter().map(|(z, s)| (*z, s))
    }

    /// Applies one parsed message.
    pub fn fold(&mut self, message: &ParsedMessage) -> FoldOutcome {
        self.last_message_at = Some(Utc::now());

        match message {
            ParsedMessage::SystemModel { model } => {
                self.model = Some(model.clone());
                session(Field::Model)
            }
            ParsedMessage::InputCount { count } => {
                self.input_count = Some(*count);
                session(Field::InputCount)
            }
            ParsedMessage::InputName { input_number, name } => {
                self.input_names.insert(*input_number, name.clone());
                for zone in self.zones.values_mut() {
                    if zone.input_number == *input_number {
                        zone.input_name = name.clone();
                    }
                }
                session(Field::InputName)
            }
            ParsedMessage::ZonePower { zone, is_on } => {
                self.zone_entry(*zone).power = *is_on;
                zoned(*zone, Field::Power)
            }
            ParsedMessage::ZoneVolume { zone, volume_db } => {
                self.zone_entry(*zone).volume_db = clamp_db(*volume_db);
                zoned(*zone, Field::Volume)
            }
            ParsedMessage::ZoneMute { zone, is_muted } => {
                self.zone_entry(*zone).muted = *is_muted;
                zoned(*zone, Field::Muted)
            }
            ParsedMessage::ZoneInput { zone, input_number } => {
                let name = self.input_name(*input_number);
                let entry = self.zone_entry(*zone);
                entry.input_number = *input_number;
                entry.input_name = name;
                zoned(*zone, Field::Input)
            }
            ParsedMessage::ZoneAudioFormat { zone, format } => {
                self.zone_entry(*zone).audio_format = format.clone();
                zoned(*zone, Field::AudioFormat)
            }
            ParsedMessage::ZoneAudioChannels { zone, channels } => {
                self.zone_entry(*zone).audio_channels = channels.clone();
                zoned(*zone, Field::AudioChannels)
            }
            ParsedMessage::ZoneVideoResolution { zone, resolution } => {
                self.zone_entry(*zone).video_resolution = resolution.clone();
                zoned(*zone, Field::VideoResolution)
            }
            ParsedMessage::ZoneListeningMode { zone, mode_name, .. } => {
                self.zone_entry(*zone).listening_mode = mode_name.clone();
                zoned(*zone, Field::ListeningMode)
            }
            ParsedMessage::ZoneSampleRateInfo { zone, info } => {
                self.zone_entry(*zone).sample_rate = info.clone();
                zoned(*zone, Field::SampleRate)
            }
            ParsedMessage::ZoneSampleRate { zone, rate_khz } => {
                self.zone_entry(*zone).sample_rate = format!("{rate_khz} kHz");
                zoned(*zone, Field::SampleRate)
            }
            ParsedMessage::ZoneBitDepth { zone, depth } => {
                self.zone_entry(*zone).bit_depth = format!("{depth}-bit");
                zoned(*zone, Field::BitDepth)
            }
        }
    }

    /// Resets every zone to its defaults, keeping the zones themselves.
    ///
    /// Model and input names describe the receiver rather than the session and
    /// are kept.
    pub fn invalidate_zones(&mut self) {
        for zone in self.zones.values_mut() {
            *zone = ZoneState::default();
        }
    }

    /// Display name for an input number.
    ///
    /// Receiver-reported names win over the default source list.
    pub fn input_name(&self, input: u32) -> String {
        if let Some(name) = self.input_names.get(&input) {
            return name.clone();
        }
        tables::default_source_name(input)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Input {input}"))
    }

    /// Resolves a source name to its input number.
    pub fn input_number_by_name(&self, name: &str) -> Option<u32> {
        let wanted = name.trim();
        self.input_names
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(wanted))
            .map(|(num, _)| *num)
            .or_else(|| tables::default_source_number(wanted))
    }

    /// Names offered as selectable sources.
    pub fn source_list(&self) -> Vec<String> {
        if self.input_names.is_empty() {
            tables::DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
        } else {
            self.input_names.values().cloned().collect()
        }
    }

    /// String-keyed snapshot lookup for callers outside the crate.
    ///
    /// Accepts `model`, `input_count`, or a zone field name (the [`Field`]
    /// names, plus `volume_db` and `input_number`), optionally prefixed with
    /// `zone<n>.` (zone 1 when omitted).
    ///
    /// Power, volume, mute and input always have a value once the zone is
    /// tracked, their defaults until the receiver reports. Text telemetry and
    /// `model` return `None` until observed.
    pub fn cached_value(&self, key: &str) -> Option<Value> {
        match key {
            "model" => return self.model.clone().map(Value::String),
            "input_count" => return self.input_count.map(Value::from),
            _ => {}
        }

        let (zone, field) = match key.split_once('.') {
            Some((prefix, field)) => (prefix.strip_prefix("zone")?.parse::<u8>().ok()?, field),
            None => (1, key),
        };
        let zone = self.zones.get(&zone)?;

        let text = match field {
            "power" => return Some(Value::from(zone.power)),
            "volume" | "volume_db" => return Some(Value::from(zone.volume_db)),
            "muted" => return Some(Value::from(zone.muted)),
            "input" | "input_number" => return Some(Value::from(zone.input_number)),
            "input_name" => &zone.input_name,
            "audio_format" => &zone.audio_format,
            "audio_channels" => &zone.audio_channels,
            "video_resolution" => &zone.video_resolution,
            "listening_mode" => &zone.listening_mode,
            "sample_rate" => &zone.sample_rate,
            "bit_depth" => &zone.bit_depth,
            _ => return None,
        };
        (text != UNKNOWN).then(|| Value::String(text.clone()))
    }

    fn zone_entry(&mut self, zone: u8) -> &mut ZoneState {
        self.zones.entry(zone).or_default()
    }
}

fn session(field: Field) -> FoldOutcome {
    FoldOutcome { zone: None, field }
}

fn zoned(zone: u8, field: Field) -> FoldOutcome {
    FoldOutcome {
        zone: Some(zone),
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold_all(state: &mut DeviceState, messages: &[ParsedMessage]) -> Vec<FoldOutcome> {
        messages.iter().map(|m| state.fold(m)).collect()
    }

    #[test]
    fn configured_zones_exist_up_front() {
        let state = DeviceState::new([1, 2]);
        assert!(state.zone(1).is_some());
        assert!(state.zone(2).is_some());
        assert!(state.zone(3).is_none());
    }

    #[test]
    fn unseen_zone_is_created_lazily() {
        let mut state = DeviceState::new([1]);
        let outcome = state.fold(&ParsedMessage::ZonePower { zone: 3, is_on: true });
        assert_eq!(
            outcome,
            FoldOutcome {
                zone: Some(3),
                field: Field::Power
            }
        );
        assert!(state.zone(3).unwrap().power);
    }

    #[test]
    fn system_messages_update_session_fields() {
        let mut state = DeviceState::new([1]);
        let outcomes = fold_all(
            &mut state,
            &[
                ParsedMessage::SystemModel {
                    model: "MRX 1120".into(),
                },
                ParsedMessage::InputCount { count: 2 },
                ParsedMessage::InputName {
                    input_number: 2,
                    name: "Apple TV".into(),
                },
            ],
        );
        assert!(outcomes.iter().all(|o| o.zone.is_none()));
        assert_eq!(state.model.as_deref(), Some("MRX 1120"));
        assert_eq!(state.input_count, Some(2));
        assert_eq!(state.input_names.get(&2).map(String::as_str), Some("Apple TV"));
        assert!(state.last_message_at.is_some());
    }

    #[test]
    fn volume_is_clamped() {
        let mut state = DeviceState::new([1]);
        state.fold(&ParsedMessage::ZoneVolume {
            zone: 1,
            volume_db: 12,
        });
        assert_eq!(state.zone(1).unwrap().volume_db, 0);
        state.fold(&ParsedMessage::ZoneVolume {
            zone: 1,
            volume_db: -120,
        });
        assert_eq!(state.zone(1).unwrap().volume_db, -90);
    }

    #[test]
    fn input_resolves_names() {
        let mut state = DeviceState::new([1, 2]);
        state.fold(&ParsedMessage::ZoneInput {
            zone: 1,
            input_number: 3,
        });
        assert_eq!(state.zone(1).unwrap().input_name, "HDMI 3");

        state.fold(&ParsedMessage::ZoneInput {
            zone: 2,
            input_number: 40,
        });
        assert_eq!(state.zone(2).unwrap().input_name, "Input 40");

        // a later IS..IN message renames the input a zone is already on
        state.fold(&ParsedMessage::InputName {
            input_number: 3,
            name: "Blu-ray".into(),
        });
        assert_eq!(state.zone(1).unwrap().input_name, "Blu-ray");
        assert_eq!(state.input_number_by_name("blu-ray"), Some(3));
        assert_eq!(state.input_number_by_name("HDMI 5"), Some(5));
        assert_eq!(state.input_number_by_name("nothing"), None);
    }

    #[test]
    fn sensor_fields() {
        let mut state = DeviceState::new([1]);
        let outcomes = fold_all(
            &mut state,
            &[
                ParsedMessage::ZoneAudioFormat {
                    zone: 1,
                    format: "Dolby Atmos".into(),
                },
                ParsedMessage::ZoneAudioChannels {
                    zone: 1,
                    channels: "7.1.4".into(),
                },
                ParsedMessage::ZoneVideoResolution {
                    zone: 1,
                    resolution: "4K".into(),
                },
                ParsedMessage::ZoneListeningMode {
                    zone: 1,
                    mode_number: 3,
                    mode_name: "Dolby Surround".into(),
                },
                ParsedMessage::ZoneSampleRate { zone: 1, rate_khz: 48 },
                ParsedMessage::ZoneBitDepth { zone: 1, depth: 24 },
            ],
        );
        assert!(outcomes.iter().all(|o| o.field.is_sensor()));

        let zone = state.zone(1).unwrap();
        assert_eq!(zone.audio_format, "Dolby Atmos");
        assert_eq!(zone.audio_channels, "7.1.4");
        assert_eq!(zone.video_resolution, "4K");
        assert_eq!(zone.listening_mode, "Dolby Surround");
        assert_eq!(zone.sample_rate, "48 kHz");
        assert_eq!(zone.bit_depth, "24-bit");

        state.fold(&ParsedMessage::ZoneSampleRateInfo {
            zone: 1,
            info: "44.1kHz".into(),
        });
        assert_eq!(state.zone(1).unwrap().sample_rate, "44.1kHz");
    }

    #[test]
    fn folding_twice_is_idempotent_and_reports_both_times() {
        let msg = ParsedMessage::ZoneMute {
            zone: 1,
            is_muted: true,
        };
        let mut state = DeviceState::new([1]);
        let first = state.fold(&msg);
        let snapshot = state.zone(1).cloned();
        let second = state.fold(&msg);
        assert_eq!(first, second);
        assert_eq!(state.zone(1).cloned(), snapshot);
    }

    #[test]
    fn invalidate_resets_zones_but_keeps_identity() {
        let mut state = DeviceState::new([1]);
        state.fold(&ParsedMessage::SystemModel {
            model: "AVM 60".into(),
        });
        state.fold(&ParsedMessage::ZonePower { zone: 1, is_on: true });
        state.fold(&ParsedMessage::ZoneAudioFormat {
            zone: 2,
            format: "PCM".into(),
        });

        state.invalidate_zones();

        assert_eq!(state.zone(1), Some(&ZoneState::default()));
        assert_eq!(state.zone(2), Some(&ZoneState::default()));
        assert_eq!(state.model.as_deref(), Some("AVM 60"));
    }

    #[test]
    fn cached_value_lookup() {
        let mut state = DeviceState::new([1, 2]);
        assert_eq!(state.cached_value("model"), None);
        assert_eq!(state.cached_value("audio_format"), None);

        state.fold(&ParsedMessage::SystemModel {
            model: "MRX 720".into(),
        });
        state.fold(&ParsedMessage::ZoneVolume {
            zone: 2,
            volume_db: -30,
        });
        state.fold(&ParsedMessage::ZoneVideoResolution {
            zone: 1,
            resolution: "1080p".into(),
        });

        assert_eq!(state.cached_value("model"), Some(Value::from("MRX 720")));
        assert_eq!(state.cached_value("zone2.volume_db"), Some(Value::from(-30)));
        assert_eq!(state.cached_value("video_resolution"), Some(Value::from("1080p")));
        assert_eq!(state.cached_value("zone9.power"), None);
        assert_eq!(state.cached_value("bogus"), None);
        assert_eq!(state.cached_value("area.power"), None);
    }

    #[test]
    fn cached_value_accepts_field_names() {
        let mut state = DeviceState::new([1]);
        // controllable fields report their defaults before any message
        assert_eq!(state.cached_value("power"), Some(Value::from(false)));
        assert_eq!(state.cached_value("volume"), Some(Value::from(-90)));
        assert_eq!(state.cached_value("input_name"), None);

        state.fold(&ParsedMessage::ZoneInput {
            zone: 1,
            input_number: 3,
        });
        state.fold(&ParsedMessage::ZoneVolume {
            zone: 1,
            volume_db: -40,
        });

        for field in [Field::Volume, Field::Input, Field::InputName, Field::Muted] {
            assert!(
                state.cached_value(field.as_str()).is_some(),
                "{field} not resolvable"
            );
        }
        assert_eq!(state.cached_value("volume"), state.cached_value("volume_db"));
        assert_eq!(state.cached_value("input"), Some(Value::from(3)));
        assert_eq!(state.cached_value("zone1.input_name"), Some(Value::from("HDMI 3")));
        assert_eq!(state.cached_value("bit_depth"), None);
    }

    #[test]
    fn source_list_prefers_reported_names() {
        let mut state = DeviceState::new([1]);
        assert_eq!(state.source_list().len(), 15);
        state.fold(&ParsedMessage::InputName {
            input_number: 1,
            name: "TV".into(),
        });
        assert_eq!(state.source_list(), vec!["TV".to_string()]);
    }

    #[test]
    fn field_classification() {
        assert!(Field::AudioFormat.is_sensor());
        assert!(Field::BitDepth.is_sensor());
        assert!(!Field::Power.is_sensor());
        assert!(!Field::Input.is_sensor());
        assert!(!Field::Model.is_sensor());
        assert_eq!(Field::VideoResolution.to_string(), "video_resolution");
    }
}
