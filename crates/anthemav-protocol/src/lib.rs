//! Wire protocol for Anthem A/V receivers.
//!
//! The receiver speaks a line-oriented ASCII protocol over TCP: commands are
//! terminated with `;` and status lines arrive unsolicited. This crate
//! provides:
//!
//! - [`parse_message`]: classification of one incoming line
//! - [`Command`]: validated encoding of outgoing commands
//! - [`LineReader`] / [`LineWriter`]: async line framing over a byte stream

pub mod command;
pub mod error;
pub mod framing;
pub mod keys;
pub mod parser;

pub use anthemav_core::ParsedMessage;
pub use command::{
    Balance, Command, Direction, DynamicRange, MAX_INPUT, MAX_ZONE, ToneControl, status_queries,
};
pub use error::{EncodeError, ProtocolError, ProtocolResult};
pub use framing::{LineDecoder, LineReader, LineWriter, TERMINATOR, encode_line};
pub use keys::ZoneKey;
pub use parser::{FLAG_SET_MARKER, flag_is_set, parse_message};

/// Default TCP port of the receiver's control interface.
pub const DEFAULT_PORT: u16 = 14999;

/// Maximum length in bytes of a single line in either direction.
pub const MAX_LINE_LENGTH: usize = 1024;
