//! Core types: zone state, fold step, lookup tables, volume scale, tracing.
//!
//! Nothing in this crate performs I/O. The protocol crate turns wire lines
//! into [`ParsedMessage`]s and the device crate folds them into a
//! [`DeviceState`].

pub mod message;
pub mod state;
pub mod tables;
pub mod tracing;
pub mod volume;
pub mod zone;

pub use message::ParsedMessage;
pub use state::{DeviceState, Field, FoldOutcome};
pub use tables::{listening_mode_name, listening_mode_number};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use volume::{MAX_VOLUME_DB, MIN_VOLUME_DB, db_to_percentage, percentage_to_db};
pub use zone::{UNKNOWN, ZoneState};
