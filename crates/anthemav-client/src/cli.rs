//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// anthemav - control Anthem A/V receivers over the network
#[derive(Debug, Parser)]
#[command(name = "anthemav")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ANTHEMAV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Receiver host name or address (overrides the config file)
    #[arg(long, env = "ANTHEMAV_HOST")]
    pub host: Option<String>,

    /// Receiver control port (overrides the config file)
    #[arg(long, env = "ANTHEMAV_PORT")]
    pub port: Option<u16>,

    /// Zone to address
    #[arg(long, short, default_value_t = 1)]
    pub zone: u8,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Seconds to wait for the receiver to report state
    #[arg(long, default_value = "3")]
    pub wait: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show model and zone state
    Status,

    /// Stay connected and print every update
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Turn a zone on or off
    Power {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Change volume
    Volume {
        #[command(subcommand)]
        action: VolumeAction,
    },

    /// Mute, unmute or toggle
    Mute {
        #[arg(value_enum)]
        state: MuteState,
    },

    /// Select an input by number or name
    Input { input: String },

    /// Select a listening mode by name or number
    Mode { mode: String },

    /// Send a raw protocol command (without terminator)
    Send { command: String },

    /// Check that a receiver answers at the configured address
    Probe,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MuteState {
    On,
    Off,
    Toggle,
}

/// Volume actions.
#[derive(Debug, Subcommand)]
pub enum VolumeAction {
    /// Set volume in dB (-90 to 0)
    Set {
        #[arg(allow_negative_numbers = true)]
        db: i32,
    },
    /// Set volume as a percentage (0 to 100)
    Percent { percent: f64 },
    /// One step up
    Up,
    /// One step down
    Down,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_negative_volume() {
        let cli = Cli::try_parse_from(["anthemav", "--host", "10.0.0.5", "volume", "set", "-35"])
            .unwrap();
        assert_eq!(cli.host.as_deref(), Some("10.0.0.5"));
        assert!(matches!(
            cli.command,
            Command::Volume {
                action: VolumeAction::Set { db: -35 }
            }
        ));
    }

    #[test]
    fn parses_zone_and_power() {
        let cli = Cli::try_parse_from(["anthemav", "-z", "2", "power", "on"]).unwrap();
        assert_eq!(cli.zone, 2);
        assert!(matches!(cli.command, Command::Power { state: Switch::On }));
    }

    #[test]
    fn rejects_unknown_mute_state() {
        assert!(Cli::try_parse_from(["anthemav", "mute", "maybe"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
