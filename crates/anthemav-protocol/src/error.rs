//! Protocol error types.

use thiserror::Error;

/// Result type for framing operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while reading or writing lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Outgoing line exceeds the maximum length.
    #[error("line too long: {len} bytes (max: {max})")]
    LineTooLong { len: usize, max: usize },

    /// Operation timed out.
    #[error("timeout during {operation}")]
    Timeout { operation: String },
}

/// Rejections raised before a command reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("invalid zone {zone} (expected 1..={max})")]
    InvalidZone { zone: u8, max: u8 },

    #[error("invalid input {input} (expected 1..={max})")]
    InvalidInput { input: u32, max: u32 },

    #[error("unknown listening mode: {0}")]
    UnknownListeningMode(String),

    #[error("unknown speaker channel: {0}")]
    UnknownSpeakerChannel(String),

    #[error("unknown dynamic range setting: {0}")]
    UnknownDynamicRange(String),

    /// Raw command that is empty or contains a terminator.
    #[error("invalid raw command: {0:?}")]
    InvalidCommand(String),
}
