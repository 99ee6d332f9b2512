//! Receiver line parser.
//!
//! [`parse_message`] is pure: it never fails, it either recognises a line or
//! returns `None`. Zone payloads are dispatched on keyword containment in the
//! fixed order of [`ZoneKey::PRIORITY`]; a keyword whose value cannot be
//! extracted falls through to the next keyword.

use std::sync::LazyLock;

use regex::Regex;

use anthemav_core::{ParsedMessage, listening_mode_name};

use crate::keys::{
    ERROR_EXECUTION_FAILED, ERROR_INVALID_COMMAND, INPUT_COUNT, SYSTEM_MODEL, ZoneKey,
};

/// Character whose presence anywhere in a `POW`/`MUT` payload means "on".
///
/// This is a containment test, not a digit comparison: `POW10` reads as on.
pub const FLAG_SET_MARKER: char = '1';

static INPUT_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ICN(\d+)").expect("Invalid input count regex"));

static INPUT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^IS(\d{1,2})IN(.+)").expect("Invalid input name regex"));

static ZONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Z(\d+)(.+)").expect("Invalid zone regex"));

static VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VOL(-?\d+)").expect("Invalid volume regex"));

static INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"INP(\d+)").expect("Invalid input regex"));

static LISTENING_MODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ALM(\d+)").expect("Invalid listening mode regex"));

static SAMPLE_RATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SRT(\d+)").expect("Invalid sample rate regex"));

static BIT_DEPTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BDP(\d+)").expect("Invalid bit depth regex"));

/// Returns true when a boolean payload is considered set.
pub fn flag_is_set(payload: &str) -> bool {
    payload.contains(FLAG_SET_MARKER)
}

/// Parses one line (without terminator) from the receiver.
///
/// Error replies (`!I`, `!E`) and anything unrecognised return `None`. Zone
/// tokens are accepted from 1 to 255; larger ones do not fit the zone type
/// and the line is dropped like any other unrecognised line.
pub fn parse_message(line: &str) -> Option<ParsedMessage> {
    if line.is_empty() {
        return None;
    }

    if line.starts_with(ERROR_INVALID_COMMAND) || line.starts_with(ERROR_EXECUTION_FAILED) {
        return None;
    }

    if let Some(rest) = line.strip_prefix(SYSTEM_MODEL) {
        return Some(ParsedMessage::SystemModel {
            model: rest.trim().to_string(),
        });
    }

    if line.starts_with(INPUT_COUNT)
        && let Some(count) = capture_number(&INPUT_COUNT_RE, line)
    {
        return Some(ParsedMessage::InputCount { count });
    }

    if let Some(caps) = INPUT_NAME_RE.captures(line)
        && let Ok(input_number) = caps[1].parse::<u32>()
    {
        return Some(ParsedMessage::InputName {
            input_number,
            name: caps[2].trim().to_string(),
        });
    }

    let caps = ZONE_RE.captures(line)?;
    let zone = caps[1].parse::<u8>().ok().filter(|z| *z > 0)?;
    parse_zone_payload(zone, &caps[2])
}

fn parse_zone_payload(zone: u8, payload: &str) -> Option<ParsedMessage> {
    for key in ZoneKey::PRIORITY {
        if !payload.contains(key.as_str()) {
            continue;
        }
        if let Some(message) = parse_zone_key(zone, key, payload) {
            return Some(message);
        }
    }
    None
}

fn parse_zone_key(zone: u8, key: ZoneKey, payload: &str) -> Option<ParsedMessage> {
    match key {
        ZoneKey::Power => Some(ParsedMessage::ZonePower {
            zone,
            is_on: flag_is_set(payload),
        }),
        ZoneKey::Volume => {
            let caps = VOLUME_RE.captures(payload)?;
            let volume_db = caps[1].parse::<i32>().ok()?;
            Some(ParsedMessage::ZoneVolume { zone, volume_db })
        }
        ZoneKey::Mute => Some(ParsedMessage::ZoneMute {
            zone,
            is_muted: flag_is_set(payload),
        }),
        ZoneKey::Input => {
            let input_number = capture_number(&INPUT_RE, payload)?;
            Some(ParsedMessage::ZoneInput { zone, input_number })
        }
        ZoneKey::AudioFormat => {
            let format = text_after(payload, key)?;
            Some(ParsedMessage::ZoneAudioFormat { zone, format })
        }
        ZoneKey::AudioChannels => {
            let channels = text_after(payload, key)?;
            Some(ParsedMessage::ZoneAudioChannels { zone, channels })
        }
        ZoneKey::VideoResolution => {
            let resolution = text_after(payload, key)?;
            Some(ParsedMessage::ZoneVideoResolution { zone, resolution })
        }
        ZoneKey::ListeningMode => {
            // query echoes such as `Z1ALM?` are not state
            if payload.contains('?') {
                return None;
            }
            let mode_number = capture_number(&LISTENING_MODE_RE, payload)?;
            Some(ParsedMessage::ZoneListeningMode {
                zone,
                mode_number,
                mode_name: listening_mode_name(mode_number),
            })
        }
        ZoneKey::SampleRateInfo => {
            let info = text_after(payload, key)?;
            Some(ParsedMessage::ZoneSampleRateInfo { zone, info })
        }
        ZoneKey::SampleRate => {
            let rate_khz = capture_number(&SAMPLE_RATE_RE, payload)?;
            Some(ParsedMessage::ZoneSampleRate { zone, rate_khz })
        }
        ZoneKey::BitDepth => {
            let depth = capture_number(&BIT_DEPTH_RE, payload)?;
            Some(ParsedMessage::ZoneBitDepth { zone, depth })
        }
    }
}

fn capture_number(re: &Regex, haystack: &str) -> Option<u32> {
    re.captures(haystack)?[1].parse().ok()
}

/// Trimmed text following the first occurrence of `key`; at least one
/// character must follow the keyword.
fn text_after(payload: &str, key: ZoneKey) -> Option<String> {
    let (_, rest) = payload.split_once(key.as_str())?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.trim().to_string())
}
