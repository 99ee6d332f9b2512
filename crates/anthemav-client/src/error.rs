//! Client error types.

use std::fmt;

use anthemav_device::DeviceError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Device session error.
    Device(DeviceError),
    /// IO error.
    Io(std::io::Error),
    /// Receiver did not answer in time.
    Timeout(String),
    /// Source name or number that matches no input.
    UnknownInput(String),
    /// Command could not be written to the receiver.
    NotSent(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Device(err) => write!(f, "device error: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
            Self::UnknownInput(name) => write!(f, "unknown input: {}", name),
            Self::NotSent(cmd) => write!(f, "command not sent: {}", cmd),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<DeviceError> for ClientError {
    fn from(err: DeviceError) -> Self {
        Self::Device(err)
    }
}

impl From<anthemav_protocol::EncodeError> for ClientError {
    fn from(err: anthemav_protocol::EncodeError) -> Self {
        Self::Device(DeviceError::Encode(err))
    }
}

impl From<anthemav_core::TracingError> for ClientError {
    fn from(err: anthemav_core::TracingError) -> Self {
        Self::Config(err.to_string())
    }
}
