//! anthemav CLI entry point.

use std::process::ExitCode;
use std::time::Duration;

use anthemav_core::{TracingConfig, init_tracing};
use clap::Parser;

use anthemav_client::cli::{Cli, Command, ConfigAction};
use anthemav_client::commands::{config as config_cmd, device};
use anthemav_client::config::ClientConfig;
use anthemav_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn tracing_config(cli: &Cli, config: &ClientConfig) -> ClientResult<TracingConfig> {
    if cli.debug {
        return Ok(TracingConfig::cli_debug());
    }
    if matches!(cli.command, Command::Watch { .. }) && cli.json {
        return Ok(TracingConfig::daemon());
    }
    config.logging.tracing_config().map_err(ClientError::Config)
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    init_tracing(tracing_config(&cli, &config)?)?;

    let host = cli.host.as_deref();
    let wait = Duration::from_secs(cli.wait);

    if let Command::Config { ref action } = cli.command {
        return match action {
            ConfigAction::Dump => config_cmd::dump(&config),
            ConfigAction::Validate => config_cmd::validate(&config, host, cli.port),
            ConfigAction::Path => config_cmd::path(),
        };
    }

    let device_config = config
        .device_config(host, cli.port)
        .map_err(ClientError::Config)?;

    match cli.command {
        Command::Watch { duration } => {
            device::watch(device_config, cli.json, duration.map(Duration::from_secs)).await
        }
        Command::Probe => device::probe(device_config, cli.json).await,
        command => {
            let ctx = device::DeviceContext::connect(device_config, cli.zone, wait).await?;
            match command {
                Command::Status => device::status(ctx, cli.json).await,
                Command::Power { state } => device::power(ctx, state).await,
                Command::Volume { action } => device::volume(ctx, action).await,
                Command::Mute { state } => device::mute(ctx, state).await,
                Command::Input { ref input } => device::input(ctx, input).await,
                Command::Mode { ref mode } => device::mode(ctx, mode).await,
                Command::Send { ref command } => device::send(ctx, command).await,
                Command::Watch { .. } | Command::Probe | Command::Config { .. } => Ok(()),
            }
        }
    }
}
