//! CLI for Anthem A/V receivers.
//!
//! This crate provides the `anthemav` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
