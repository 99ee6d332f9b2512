//! Static lookup tables shared by the parser and the command encoder.

/// Listening modes, indexed by their wire number.
pub const LISTENING_MODES: [&str; 16] = [
    "None",
    "AnthemLogic Cinema",
    "AnthemLogic Music",
    "Dolby Surround",
    "DTS Neural:X",
    "Stereo",
    "Multi-Channel Stereo",
    "All-Channel Stereo",
    "PLIIx Movie",
    "PLIIx Music",
    "Neo:6 Cinema",
    "Neo:6 Music",
    "Dolby Digital",
    "DTS",
    "PCM Stereo",
    "Direct",
];

/// Speaker channels addressable by the level up/down commands.
pub const SPEAKER_CHANNELS: [(&str, u32); 9] = [
    ("Subwoofer", 1),
    ("Front Left/Right", 5),
    ("Front Wide", 6),
    ("Center", 7),
    ("Surround", 8),
    ("Back", 9),
    ("Height 1", 10),
    ("Height 2", 11),
    ("Height 3", 12),
];

/// Dolby dynamic range settings.
pub const DYNAMIC_RANGE_MODES: [(&str, u32); 3] =
    [("normal", 0), ("reduced", 1), ("late_night", 2)];

/// Sources offered before the receiver has reported its own input names.
///
/// Position in the list (1-based) is the input number.
pub const DEFAULT_SOURCES: [&str; 15] = [
    "HDMI 1",
    "HDMI 2",
    "HDMI 3",
    "HDMI 4",
    "HDMI 5",
    "HDMI 6",
    "HDMI 7",
    "HDMI 8",
    "Analog 1",
    "Analog 2",
    "Digital 1",
    "Digital 2",
    "USB",
    "Network",
    "ARC",
];

/// Returns the friendly name of a listening mode.
///
/// Numbers outside the table resolve to `"Mode <n>"`.
pub fn listening_mode_name(mode: u32) -> String {
    usize::try_from(mode)
        .ok()
        .and_then(|idx| LISTENING_MODES.get(idx))
        .map(|name| (*name).to_string())
        .unwrap_or_else(|| format!("Mode {mode}"))
}

/// Returns the wire number for a listening mode name (case-insensitive).
pub fn listening_mode_number(name: &str) -> Option<u32> {
    LISTENING_MODES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name.trim()))
        .map(|idx| idx as u32)
}

/// Returns the channel number for a speaker channel name (case-insensitive).
pub fn speaker_channel_number(name: &str) -> Option<u32> {
    lookup(&SPEAKER_CHANNELS, name)
}

/// Returns the wire value for a dynamic range setting (case-insensitive).
pub fn dynamic_range_number(name: &str) -> Option<u32> {
    lookup(&DYNAMIC_RANGE_MODES, name)
}

/// Returns the default name for an input number, if it is within the default list.
pub fn default_source_name(input: u32) -> Option<&'static str> {
    let idx = usize::try_from(input).ok()?.checked_sub(1)?;
    DEFAULT_SOURCES.get(idx).copied()
}

/// Returns the input number of a default source name (case-insensitive).
pub fn default_source_number(name: &str) -> Option<u32> {
    DEFAULT_SOURCES
        .iter()
        .position(|s| s.eq_ignore_ascii_case(name.trim()))
        .map(|idx| idx as u32 + 1)
}

fn lookup(table: &[(&str, u32)], name: &str) -> Option<u32> {
    let name = name.trim();
    table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| *value)
}
