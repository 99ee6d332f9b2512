//! Device session for Anthem A/V receivers.
//!
//! [`DeviceSession`] owns the TCP connection to one receiver, folds every
//! received line into [`DeviceState`](anthemav_core::DeviceState) and fans
//! out [`DeviceUpdate`]s to registered listeners. The reconnect supervisor
//! started by [`DeviceSession::start`] keeps it connected.

pub mod config;
pub mod error;
pub mod events;
pub mod reconnect;
pub mod session;
pub mod setup;

pub use config::{DeviceConfig, RetentionPolicy, ZoneConfig};
pub use error::{DeviceError, DeviceResult};
pub use events::{
    ChannelListener, DeviceUpdate, EventEmitter, LoggingListener, UpdateListener,
    device_id_from_entity_id, media_player_entity_id, remote_entity_id, sensor_entity_id,
};
pub use reconnect::ReconnectConfig;
pub use session::{ConnectionStatus, DeviceSession};
pub use setup::{ProbeTiming, VerifyReport, verify_device, verify_device_with};
