//! Device error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised by a device session.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// TCP connect failed (refused, unreachable, DNS).
    #[error("failed to connect to {host}:{port}: {message}")]
    Connection {
        host: String,
        port: u16,
        message: String,
    },

    /// TCP connect did not complete in time.
    #[error("connection to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    /// Operation requires an open connection.
    #[error("not connected")]
    NotConnected,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] anthemav_protocol::ProtocolError),

    /// Command rejected before reaching the wire.
    #[error("invalid command: {0}")]
    Encode(#[from] anthemav_protocol::EncodeError),

    #[error("configuration error: {message}")]
    Config { message: String },

    /// Session was shut down while the operation was pending.
    #[error("device session shut down")]
    Shutdown,
}

impl DeviceError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(host: impl Into<String>, port: u16, message: impl Into<String>) -> Self {
        Self::Connection {
            host: host.into(),
            port,
            message: message.into(),
        }
    }

    /// Returns true for failures the reconnect supervisor should retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectTimeout { .. } | Self::Io(_) | Self::NotConnected
        )
    }
}
