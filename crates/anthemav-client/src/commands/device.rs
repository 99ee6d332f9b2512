//! Commands that talk to the receiver.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anthemav_core::{DeviceState, Field, UNKNOWN};
use anthemav_device::{DeviceConfig, DeviceSession, DeviceUpdate, LoggingListener, verify_device};
use anthemav_protocol::{Command, ZoneKey};
use chrono::Local;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cli::{MuteState, Switch, VolumeAction};
use crate::error::{ClientError, ClientResult};

/// A connected session plus the options every command shares.
pub struct DeviceContext {
    pub session: DeviceSession,
    pub updates: UnboundedReceiver<DeviceUpdate>,
    pub zone: u8,
    pub wait: Duration,
}

impl DeviceContext {
    /// Connects once; the session is not supervised.
    pub async fn connect(config: DeviceConfig, zone: u8, wait: Duration) -> ClientResult<Self> {
        let session = DeviceSession::new(config)?;
        let updates = session.updates();
        session.connect().await?;
        Ok(Self {
            session,
            updates,
            zone,
            wait,
        })
    }

    /// Waits up to the configured time for an update matching `pred`.
    pub async fn wait_for<F>(&mut self, pred: F) -> Option<DeviceUpdate>
    where
        F: Fn(&DeviceUpdate) -> bool,
    {
        let deadline = Instant::now() + self.wait;
        loop {
            let update = tokio::time::timeout_at(deadline, self.updates.recv())
                .await
                .ok()??;
            if pred(&update) {
                return Some(update);
            }
        }
    }

    pub async fn close(self) {
        self.session.disconnect().await;
    }
}

fn ensure_sent(sent: bool, what: &str) -> ClientResult<()> {
    if sent {
        Ok(())
    } else {
        Err(ClientError::NotSent(what.to_string()))
    }
}

/// Queries model and every enabled zone, waits for the answers, and prints
/// the folded state.
pub async fn status(mut ctx: DeviceContext, json: bool) -> ClientResult<()> {
    let zones = ctx.session.config().enabled_zones();
    ensure_sent(ctx.session.query_model().await, "IDM?")?;
    for &zone in &zones {
        ensure_sent(ctx.session.query_all_status(zone).await?, "status query")?;
    }

    let mut pending: Vec<u8> = zones.clone();
    let mut have_model = false;
    let deadline = Instant::now() + ctx.wait;
    while !(have_model && pending.is_empty()) {
        let Ok(Some(update)) = tokio::time::timeout_at(deadline, ctx.updates.recv()).await else {
            break;
        };
        match (update.zone, update.field) {
            (None, Some(Field::Model)) => have_model = true,
            (Some(zone), Some(Field::Input)) => pending.retain(|z| *z != zone),
            _ => {}
        }
    }

    let state = ctx.session.state().await;
    let config = ctx.session.config().clone();
    ctx.close().await;

    if state.model.is_none() && state.last_message_at.is_none() {
        return Err(ClientError::Timeout(format!(
            "{}:{} did not report any state",
            config.host, config.port
        )));
    }

    if json {
        let out = serde_json::to_string_pretty(&state)
            .map_err(|e| ClientError::Config(format!("failed to serialize state: {}", e)))?;
        println!("{}", out);
    } else {
        print!("{}", render_status(&state, &config));
    }
    Ok(())
}

/// Human-readable status for the configured zones.
pub fn render_status(state: &DeviceState, config: &DeviceConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({}:{})", config.name, config.host, config.port);
    let _ = writeln!(out, "  model: {}", state.model.as_deref().unwrap_or(UNKNOWN));

    for zone_number in config.enabled_zones() {
        let Some(zone) = state.zone(zone_number) else {
            continue;
        };
        let name = config
            .zone(zone_number)
            .map(|z| z.display_name())
            .unwrap_or_else(|| format!("Zone {zone_number}"));

        let _ = writeln!(out, "{} [{}]", name, if zone.power { "ON" } else { "OFF" });
        let _ = writeln!(
            out,
            "  volume: {} dB ({:.0}%){}",
            zone.volume_db,
            zone.volume_percent(),
            if zone.muted { " muted" } else { "" }
        );
        let _ = writeln!(out, "  input: {} ({})", zone.input_name, zone.input_number);

        if zone_number == 1 && zone.has_telemetry() {
            let _ = writeln!(
                out,
                "  audio: {} {} | {} | {} {}",
                zone.audio_format,
                zone.audio_channels,
                zone.listening_mode,
                zone.sample_rate,
                zone.bit_depth
            );
            let _ = writeln!(out, "  video: {}", zone.video_resolution);
        }
    }
    out
}

/// Stays connected through the reconnect supervisor and prints updates.
pub async fn watch(
    config: DeviceConfig,
    json: bool,
    duration: Option<Duration>,
) -> ClientResult<()> {
    let session = DeviceSession::new(config)?;
    session.subscribe(Arc::new(LoggingListener));
    let mut updates = session.updates();
    session.start().await;
    info!(device = %session.identifier(), "watching");

    let stop = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    debug!(error = %e, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
            }
        }
    };
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            update = updates.recv() => match update {
                Some(update) => println!("{}", render_update(&update, json)),
                None => break,
            },
        }
    }

    session.disconnect().await;
    Ok(())
}

/// One update as a single output line.
pub fn render_update(update: &DeviceUpdate, json: bool) -> String {
    if json {
        serde_json::to_string(update).unwrap_or_default()
    } else {
        let attrs = update
            .attributes
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {} {}", Local::now().format("%H:%M:%S"), update.entity_id, attrs)
    }
}

pub async fn power(ctx: DeviceContext, state: Switch) -> ClientResult<()> {
    let sent = match state {
        Switch::On => ctx.session.power_on(ctx.zone).await?,
        Switch::Off => ctx.session.power_off(ctx.zone).await?,
    };
    ctx.close().await;
    ensure_sent(sent, "power")
}

pub async fn volume(ctx: DeviceContext, action: VolumeAction) -> ClientResult<()> {
    let zone = ctx.zone;
    let sent = match action {
        VolumeAction::Set { db } => ctx.session.set_volume(db, zone).await?,
        VolumeAction::Percent { percent } => ctx.session.set_volume_percent(percent, zone).await?,
        VolumeAction::Up => ctx.session.volume_up(zone).await?,
        VolumeAction::Down => ctx.session.volume_down(zone).await?,
    };
    ctx.close().await;
    ensure_sent(sent, "volume")
}

pub async fn mute(mut ctx: DeviceContext, state: MuteState) -> ClientResult<()> {
    let zone = ctx.zone;
    let sent = match state {
        MuteState::On => ctx.session.set_mute(true, zone).await?,
        MuteState::Off => ctx.session.set_mute(false, zone).await?,
        MuteState::Toggle => {
            // toggle needs the current state
            let query = Command::QueryZone {
                zone,
                key: ZoneKey::Mute,
            };
            ensure_sent(ctx.session.send(query).await?, "mute query")?;
            if ctx
                .wait_for(|u| u.zone == Some(zone) && u.field == Some(Field::Muted))
                .await
                .is_none()
            {
                ctx.close().await;
                return Err(ClientError::Timeout("receiver did not report mute state".into()));
            }
            ctx.session.toggle_mute(zone).await?
        }
    };
    ctx.close().await;
    ensure_sent(sent, "mute")
}

/// Selects an input by number, receiver-reported name, or default name.
pub async fn input(mut ctx: DeviceContext, input: &str) -> ClientResult<()> {
    let zone = ctx.zone;
    let number = match input.trim().parse::<u32>() {
        Ok(n) => n,
        Err(_) => match resolve_input_name(&mut ctx, input).await {
            Some(n) => n,
            None => {
                ctx.close().await;
                return Err(ClientError::UnknownInput(input.to_string()));
            }
        },
    };

    let sent = ctx.session.select_input(number, zone).await;
    ctx.close().await;
    ensure_sent(sent?, "input")
}

async fn resolve_input_name(ctx: &mut DeviceContext, name: &str) -> Option<u32> {
    ctx.session.query_input_count().await;
    let count = ctx
        .wait_for(|u| u.field == Some(Field::InputCount))
        .await
        .and_then(|u| u.attributes.get("input_count").and_then(|v| v.as_u64()))
        .unwrap_or(0)
        .min(u64::from(anthemav_protocol::MAX_INPUT)) as u32;

    for input in 1..=count {
        let _ = ctx.session.send(Command::QueryInputName { input }).await;
    }
    let mut remaining = count;
    while remaining > 0 {
        if ctx
            .wait_for(|u| u.field == Some(Field::InputName))
            .await
            .is_none()
        {
            break;
        }
        remaining -= 1;
    }

    ctx.session.get_input_number_by_name(name).await
}

pub async fn mode(ctx: DeviceContext, mode: &str) -> ClientResult<()> {
    let zone = ctx.zone;
    let sent = match mode.trim().parse::<u32>() {
        Ok(n) => ctx.session.set_listening_mode(n, zone).await,
        Err(_) => ctx.session.set_listening_mode_by_name(mode, zone).await,
    };
    ctx.close().await;
    ensure_sent(sent?, "listening mode")
}

pub async fn send(ctx: DeviceContext, command: &str) -> ClientResult<()> {
    let sent = ctx.session.send_command(command).await;
    ctx.close().await;
    ensure_sent(sent, command)
}

/// Single connect plus model query, as done when adding a receiver.
pub async fn probe(config: DeviceConfig, json: bool) -> ClientResult<()> {
    let report = verify_device(config).await;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| ClientError::Config(format!("failed to serialize report: {}", e)))?;
        println!("{}", out);
    } else if let Some(ref model) = report.model {
        println!("{}:{} answered as {}", report.host, report.port, model);
    }

    if report.is_verified() {
        Ok(())
    } else {
        let reason = report
            .error
            .unwrap_or_else(|| "receiver did not answer".to_string());
        Err(ClientError::Timeout(format!(
            "{}:{}: {}",
            report.host, report.port, reason
        )))
    }
}
