//! Outgoing command encoder.
//!
//! A [`Command`] is a semantic operation; [`Command::encode`] validates it and
//! produces the wire text without the terminator. Nothing is written for a
//! command that fails to encode.

use std::fmt;
use std::str::FromStr;

use anthemav_core::tables::{self, LISTENING_MODES};
use anthemav_core::volume::{clamp_db, percentage_to_db};

use crate::MAX_LINE_LENGTH;
use crate::error::EncodeError;
use crate::framing::TERMINATOR;
use crate::keys::{INPUT_COUNT, SYSTEM_MODEL, ZoneKey};

/// Highest zone number accepted by the encoder.
pub const MAX_ZONE: u8 = 3;

/// Highest input number accepted by the encoder.
pub const MAX_INPUT: u32 = 99;

/// Up/down step direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Tone control band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneControl {
    Bass,
    Treble,
}

impl ToneControl {
    fn code(self) -> u32 {
        match self {
            Self::Bass => 0,
            Self::Treble => 1,
        }
    }
}

/// Balance step direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    Left,
    Right,
}

/// Dolby dynamic range setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicRange {
    Normal,
    Reduced,
    LateNight,
}

impl DynamicRange {
    fn code(self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::Reduced => 1,
            Self::LateNight => 2,
        }
    }
}

impl FromStr for DynamicRange {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match tables::dynamic_range_number(s) {
            Some(0) => Ok(Self::Normal),
            Some(1) => Ok(Self::Reduced),
            Some(2) => Ok(Self::LateNight),
            _ => Err(EncodeError::UnknownDynamicRange(s.to_string())),
        }
    }
}

/// A command understood by the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PowerOn { zone: u8 },
    PowerOff { zone: u8 },
    /// Absolute volume; clamped to `[-90, 0]` when encoded.
    SetVolume { zone: u8, db: i32 },
    VolumeUp { zone: u8 },
    VolumeDown { zone: u8 },
    SetMute { zone: u8, muted: bool },
    SelectInput { zone: u8, input: u32 },
    ListeningMode { zone: u8, mode: u32 },
    AudioMode { zone: u8, direction: Direction },
    Tone {
        zone: u8,
        control: ToneControl,
        direction: Direction,
    },
    Balance { zone: u8, direction: Balance },
    DynamicRange { zone: u8, setting: DynamicRange },
    CenterSpread { zone: u8, enabled: bool },
    /// Speaker level step, channel given by name (e.g. `"Center"`).
    SpeakerLevel {
        zone: u8,
        channel: String,
        direction: Direction,
    },
    QueryModel,
    QueryInputCount,
    QueryInputName { input: u32 },
    QueryZone { zone: u8, key: ZoneKey },
    /// Passed through verbatim.
    Raw(String),
}

impl Command {
    /// Volume command from a 0-100 percentage.
    pub fn set_volume_percent(zone: u8, pct: f64) -> Self {
        Self::SetVolume {
            zone,
            db: percentage_to_db(pct),
        }
    }

    /// Listening mode command from its friendly name.
    pub fn listening_mode_by_name(zone: u8, name: &str) -> Result<Self, EncodeError> {
        let mode = tables::listening_mode_number(name)
            .ok_or_else(|| EncodeError::UnknownListeningMode(name.to_string()))?;
        Ok(Self::ListeningMode { zone, mode })
    }

    /// Zone this command addresses, if any.
    pub fn zone(&self) -> Option<u8> {
        match self {
            Self::PowerOn { zone }
            | Self::PowerOff { zone }
            | Self::SetVolume { zone, .. }
            | Self::VolumeUp { zone }
            | Self::VolumeDown { zone }
            | Self::SetMute { zone, .. }
            | Self::SelectInput { zone, .. }
            | Self::ListeningMode { zone, .. }
            | Self::AudioMode { zone, .. }
            | Self::Tone { zone, .. }
            | Self::Balance { zone, .. }
            | Self::DynamicRange { zone, .. }
            | Self::CenterSpread { zone, .. }
            | Self::SpeakerLevel { zone, .. }
            | Self::QueryZone { zone, .. } => Some(*zone),
            Self::QueryModel
            | Self::QueryInputCount
            | Self::QueryInputName { .. }
            | Self::Raw(_) => None,
        }
    }

    /// Validates and renders the wire text, without terminator.
    pub fn encode(&self) -> Result<String, EncodeError> {
        if let Some(zone) = self.zone() {
            check_zone(zone)?;
        }

        let text = match self {
            Self::PowerOn { zone } => format!("Z{zone}POW1"),
            Self::PowerOff { zone } => format!("Z{zone}POW0"),
            Self::SetVolume { zone, db } => format!("Z{zone}VOL{}", clamp_db(*db)),
            Self::VolumeUp { zone } => format!("Z{zone}VUP"),
            Self::VolumeDown { zone } => format!("Z{zone}VDN"),
            Self::SetMute { zone, muted } => format!("Z{zone}MUT{}", u8::from(*muted)),
            Self::SelectInput { zone, input } => {
                check_input(*input)?;
                format!("Z{zone}INP{input}")
            }
            Self::ListeningMode { zone, mode } => {
                if *mode as usize >= LISTENING_MODES.len() {
                    return Err(EncodeError::UnknownListeningMode(mode.to_string()));
                }
                format!("Z{zone}ALM{mode}")
            }
            Self::AudioMode { zone, direction } => match direction {
                Direction::Up => format!("Z{zone}AUP"),
                Direction::Down => format!("Z{zone}ADN"),
            },
            Self::Tone {
                zone,
                control,
                direction,
            } => match direction {
                Direction::Up => format!("Z{zone}TUP{}", control.code()),
                Direction::Down => format!("Z{zone}TDN{}", control.code()),
            },
            Self::Balance { zone, direction } => match direction {
                Balance::Left => format!("Z{zone}BLT"),
                Balance::Right => format!("Z{zone}BRT"),
            },
            Self::DynamicRange { zone, setting } => format!("Z{zone}DYN{}", setting.code()),
            Self::CenterSpread { zone, enabled } => format!("Z{zone}DSCS{}", u8::from(*enabled)),
            Self::SpeakerLevel {
                zone,
                channel,
                direction,
            } => {
                let number = tables::speaker_channel_number(channel)
                    .ok_or_else(|| EncodeError::UnknownSpeakerChannel(channel.clone()))?;
                match direction {
                    Direction::Up => format!("Z{zone}LUP{number}"),
                    Direction::Down => format!("Z{zone}LDN{number}"),
                }
            }
            Self::QueryModel => format!("{SYSTEM_MODEL}?"),
            Self::QueryInputCount => format!("{INPUT_COUNT}?"),
            Self::QueryInputName { input } => {
                check_input(*input)?;
                format!("IS{input}IN?")
            }
            Self::QueryZone { zone, key } => format!("Z{zone}{}?", key.as_str()),
            Self::Raw(raw) => {
                let raw = raw.trim();
                if raw.is_empty() || raw.contains([';', '\r', '\n']) {
                    return Err(EncodeError::InvalidCommand(raw.to_string()));
                }
                raw.to_string()
            }
        };

        if text.len() + TERMINATOR.len() > MAX_LINE_LENGTH {
            return Err(EncodeError::InvalidCommand(format!(
                "{} bytes exceeds the {MAX_LINE_LENGTH}-byte line limit",
                text.len()
            )));
        }

        Ok(text)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encode() {
            Ok(text) => f.write_str(&text),
            Err(e) => write!(f, "<{e}>"),
        }
    }
}

/// Status queries for one zone: controllable state, plus sensors on zone 1.
pub fn status_queries(zone: u8) -> Vec<Command> {
    let mut keys = vec![ZoneKey::Power, ZoneKey::Volume, ZoneKey::Mute, ZoneKey::Input];
    if zone == 1 {
        keys.extend(ZoneKey::SENSORS);
    }
    keys.into_iter()
        .map(|key| Command::QueryZone { zone, key })
        .collect()
}

fn check_zone(zone: u8) -> Result<(), EncodeError> {
    if zone == 0 || zone > MAX_ZONE {
        return Err(EncodeError::InvalidZone {
            zone,
            max: MAX_ZONE,
        });
    }
    Ok(())
}

fn check_input(input: u32) -> Result<(), EncodeError> {
    if input == 0 || input > MAX_INPUT {
        return Err(EncodeError::InvalidInput {
            input,
            max: MAX_INPUT,
        });
    }
    Ok(())
}
