//! Wire prefixes and zone keywords.

/// Prefix of "invalid command" error replies.
pub const ERROR_INVALID_COMMAND: &str = "!I";
/// Prefix of "execution failed" error replies.
pub const ERROR_EXECUTION_FAILED: &str = "!E";
/// Model name reply.
pub const SYSTEM_MODEL: &str = "IDM";
/// Input count reply.
pub const INPUT_COUNT: &str = "ICN";

/// Keyword following the zone number in `Z<n><KEY>...` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKey {
    Power,
    Volume,
    Mute,
    Input,
    AudioFormat,
    AudioChannels,
    VideoResolution,
    ListeningMode,
    SampleRateInfo,
    SampleRate,
    BitDepth,
}

impl ZoneKey {
    /// All keys in the order the parser tries them.
    pub const PRIORITY: [ZoneKey; 11] = [
        ZoneKey::Power,
        ZoneKey::Volume,
        ZoneKey::Mute,
        ZoneKey::Input,
        ZoneKey::AudioFormat,
        ZoneKey::AudioChannels,
        ZoneKey::VideoResolution,
        ZoneKey::ListeningMode,
        ZoneKey::SampleRateInfo,
        ZoneKey::SampleRate,
        ZoneKey::BitDepth,
    ];

    /// Sensor keys queried for the main zone.
    pub const SENSORS: [ZoneKey; 7] = [
        ZoneKey::AudioFormat,
        ZoneKey::AudioChannels,
        ZoneKey::VideoResolution,
        ZoneKey::ListeningMode,
        ZoneKey::SampleRateInfo,
        ZoneKey::SampleRate,
        ZoneKey::BitDepth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Power => "POW",
            Self::Volume => "VOL",
            Self::Mute => "MUT",
            Self::Input => "INP",
            Self::AudioFormat => "AIF",
            Self::AudioChannels => "AIC",
            Self::VideoResolution => "VIR",
            Self::ListeningMode => "ALM",
            Self::SampleRateInfo => "AIR",
            Self::SampleRate => "SRT",
            Self::BitDepth => "BDP",
        }
    }
}
