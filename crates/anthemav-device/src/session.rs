//! Device session: one TCP connection to one receiver.
//!
//! A [`DeviceSession`] is a cheap handle; clones share the connection, the
//! folded state and the listeners. The read loop is the only task that folds
//! messages. Writes go through a single mutex-guarded writer so two commands
//! never interleave on the wire.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anthemav_core::{DeviceState, ZoneState};
use anthemav_protocol::{
    Command, LineReader, LineWriter, ProtocolError, ZoneKey, parse_message, status_queries,
};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::config::{DeviceConfig, RetentionPolicy};
use crate::error::{DeviceError, DeviceResult};
use crate::events::{self, ChannelListener, DeviceUpdate, EventEmitter, UpdateListener};
use crate::reconnect;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TaskHandle {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(f(cancel_rx));
        Self { cancel, handle }
    }

    async fn stop(self) {
        let _ = self.cancel.send(true);
        self.handle.abort();
        // aborted tasks report a JoinError, which is expected here
        let _ = self.handle.await;
    }
}

struct Inner {
    config: DeviceConfig,
    state: RwLock<DeviceState>,
    writer: Mutex<Option<LineWriter<OwnedWriteHalf>>>,
    emitter: EventEmitter,
    status_tx: watch::Sender<ConnectionStatus>,
    generation: AtomicU64,
    connect_lock: Mutex<()>,
    reader: Mutex<Option<TaskHandle>>,
    supervisor: Mutex<Option<TaskHandle>>,
}

/// Handle to one receiver.
#[derive(Clone)]
pub struct DeviceSession {
    inner: Arc<Inner>,
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("identifier", &self.inner.config.identifier)
            .field("status", &*self.inner.status_tx.borrow())
            .finish()
    }
}

impl DeviceSession {
    /// Creates a disconnected session. Configured zones are tracked from the
    /// start.
    pub fn new(config: DeviceConfig) -> DeviceResult<Self> {
        config.validate()?;

        let state = DeviceState::new(config.zones.iter().map(|z| z.zone_number));
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: RwLock::new(state),
                writer: Mutex::new(None),
                emitter: EventEmitter::new(),
                status_tx,
                generation: AtomicU64::new(0),
                connect_lock: Mutex::new(()),
                reader: Mutex::new(None),
                supervisor: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.inner.config
    }

    pub fn identifier(&self) -> &str {
        &self.inner.config.identifier
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.status_tx.borrow() == ConnectionStatus::Connected
    }

    /// Watches connection status transitions.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Registers a listener; listeners are notified in registration order.
    pub fn subscribe(&self, listener: Arc<dyn UpdateListener>) {
        self.inner.emitter.subscribe(listener);
    }

    /// Registers a channel listener and returns its receiving end.
    pub fn updates(&self) -> tokio::sync::mpsc::UnboundedReceiver<DeviceUpdate> {
        let (listener, rx) = ChannelListener::new();
        self.subscribe(Arc::new(listener));
        rx
    }

    /// Opens the TCP connection and starts the read loop.
    ///
    /// Makes a single attempt bounded by the configured timeout. Returns
    /// `Ok(())` without reconnecting when already connected.
    pub async fn connect(&self) -> DeviceResult<()> {
        let _guard = self.inner.connect_lock.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        let config = &self.inner.config;
        self.set_status(ConnectionStatus::Connecting);
        debug!(host = %config.host, port = config.port, "connecting");

        let stream = match timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.set_status(ConnectionStatus::Disconnected);
                return Err(DeviceError::connection(&config.host, config.port, e.to_string()));
            }
            Err(_) => {
                self.set_status(ConnectionStatus::Disconnected);
                return Err(DeviceError::ConnectTimeout {
                    host: config.host.clone(),
                    port: config.port,
                    timeout: config.timeout,
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.inner.writer.lock().await = Some(LineWriter::new(write_half));

        // Connected before the read loop exists, so an immediate EOF still
        // ends in Disconnected.
        self.set_status(ConnectionStatus::Connected);

        let session = self.clone();
        let task = TaskHandle::spawn(move |cancel| {
            ReadLoop {
                session,
                generation,
                reader: LineReader::new(read_half),
                cancel,
            }
            .run()
        });
        if let Some(previous) = self.inner.reader.lock().await.replace(task) {
            let _ = previous.cancel.send(true);
        }

        info!(
            device = %config.identifier,
            host = %config.host,
            port = config.port,
            "connected"
        );
        Ok(())
    }

    /// Closes the connection and stops the reconnect supervisor.
    ///
    /// Idempotent.
    pub async fn disconnect(&self) {
        let supervisor = self.inner.supervisor.lock().await.take();
        if let Some(task) = supervisor {
            task.stop().await;
        }

        let _guard = self.inner.connect_lock.lock().await;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        let reader = self.inner.reader.lock().await.take();
        if let Some(task) = reader {
            task.stop().await;
        }

        let writer = self.inner.writer.lock().await.take();
        let was_connected = writer.is_some();
        if let Some(mut writer) = writer
            && let Err(e) = writer.shutdown().await
        {
            debug!(error = %e, "error shutting down write half");
        }

        self.apply_retention().await;
        self.set_status(ConnectionStatus::Disconnected);
        if was_connected {
            info!(device = %self.identifier(), "disconnected");
        }
    }

    /// Spawns the reconnect supervisor. No-op if it is already running.
    pub async fn start(&self) {
        let mut slot = self.inner.supervisor.lock().await;
        if slot.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return;
        }
        let session = self.clone();
        *slot = Some(TaskHandle::spawn(move |cancel| {
            reconnect::supervise(session, cancel)
        }));
    }

    /// Writes a raw command. Returns false when not connected, when the
    /// command is malformed, or when the write fails or times out.
    pub async fn send_command(&self, command: &str) -> bool {
        match Command::Raw(command.to_string()).encode() {
            Ok(text) => self.write_text(&text).await,
            Err(e) => {
                warn!(error = %e, "rejected raw command");
                false
            }
        }
    }

    /// Encodes and writes a command.
    ///
    /// Errors only on an invalid command; connection failures are reported
    /// as `Ok(false)`.
    pub async fn send(&self, command: Command) -> DeviceResult<bool> {
        let text = command.encode()?;
        Ok(self.write_text(&text).await)
    }

    async fn write_text(&self, text: &str) -> bool {
        match self.try_write(text).await {
            Ok(()) => true,
            Err(DeviceError::NotConnected) => {
                debug!(command = text, "not connected, command dropped");
                false
            }
            // nothing reached the socket, the connection is still usable
            Err(e @ DeviceError::Protocol(ProtocolError::LineTooLong { .. })) => {
                warn!(error = %e, "command rejected before write");
                false
            }
            Err(e) => {
                warn!(command = text, error = %e, "command write failed");
                self.abandon_connection().await;
                false
            }
        }
    }

    async fn try_write(&self, text: &str) -> DeviceResult<()> {
        let mut guard = self.inner.writer.lock().await;
        let writer = guard.as_mut().ok_or(DeviceError::NotConnected)?;

        match timeout(self.inner.config.write_timeout, writer.write_line(text)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProtocolError::Timeout {
                    operation: "write".into(),
                }
                .into());
            }
        }
        trace!(command = text, "sent");
        Ok(())
    }

    /// Tears down a connection whose writer failed; the supervisor, if
    /// running, reconnects.
    async fn abandon_connection(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.inner.reader.lock().await.take() {
            let _ = task.cancel.send(true);
        }
        self.inner.writer.lock().await.take();
        self.apply_retention().await;
        self.set_status(ConnectionStatus::Disconnected);
    }

    pub async fn power_on(&self, zone: u8) -> DeviceResult<bool> {
        self.send(Command::PowerOn { zone }).await
    }

    pub async fn power_off(&self, zone: u8) -> DeviceResult<bool> {
        self.send(Command::PowerOff { zone }).await
    }

    /// Sets volume in dB; clamped to `[-90, 0]`.
    pub async fn set_volume(&self, db: i32, zone: u8) -> DeviceResult<bool> {
        self.send(Command::SetVolume { zone, db }).await
    }

    /// Sets volume from a 0-100 percentage.
    pub async fn set_volume_percent(&self, pct: f64, zone: u8) -> DeviceResult<bool> {
        self.send(Command::set_volume_percent(zone, pct)).await
    }

    pub async fn volume_up(&self, zone: u8) -> DeviceResult<bool> {
        self.send(Command::VolumeUp { zone }).await
    }

    pub async fn volume_down(&self, zone: u8) -> DeviceResult<bool> {
        self.send(Command::VolumeDown { zone }).await
    }

    pub async fn set_mute(&self, muted: bool, zone: u8) -> DeviceResult<bool> {
        self.send(Command::SetMute { zone, muted }).await
    }

    /// Flips mute based on the last known state.
    pub async fn toggle_mute(&self, zone: u8) -> DeviceResult<bool> {
        let muted = self
            .inner
            .state
            .read()
            .await
            .zone(zone)
            .is_some_and(|z| z.muted);
        self.set_mute(!muted, zone).await
    }

    pub async fn select_input(&self, input_number: u32, zone: u8) -> DeviceResult<bool> {
        self.send(Command::SelectInput {
            zone,
            input: input_number,
        })
        .await
    }

    pub async fn set_listening_mode(&self, mode: u32, zone: u8) -> DeviceResult<bool> {
        self.send(Command::ListeningMode { zone, mode }).await
    }

    pub async fn set_listening_mode_by_name(&self, name: &str, zone: u8) -> DeviceResult<bool> {
        self.send(Command::listening_mode_by_name(zone, name)?).await
    }

    pub async fn query_model(&self) -> bool {
        self.send(Command::QueryModel).await.unwrap_or(false)
    }

    pub async fn query_input_count(&self) -> bool {
        self.send(Command::QueryInputCount).await.unwrap_or(false)
    }

    pub async fn query_power(&self, zone: u8) -> DeviceResult<bool> {
        self.send(Command::QueryZone {
            zone,
            key: ZoneKey::Power,
        })
        .await
    }

    /// Queries power, volume, mute and input; zone 1 also gets every sensor
    /// field. Returns true only if every query was written.
    pub async fn query_all_status(&self, zone: u8) -> DeviceResult<bool> {
        let mut all_sent = true;
        for command in status_queries(zone) {
            all_sent &= self.send(command).await?;
        }
        Ok(all_sent)
    }

    /// Model and status of every enabled zone. Run after each connect.
    pub(crate) async fn refresh_status(&self) {
        self.query_model().await;
        for zone in self.inner.config.enabled_zones() {
            if let Err(e) = self.query_all_status(zone).await {
                warn!(zone, error = %e, "status query rejected");
            }
        }
    }

    /// Last known value of a field; see [`DeviceState::cached_value`].
    pub async fn get_cached_state(&self, key: &str) -> Option<Value> {
        self.inner.state.read().await.cached_value(key)
    }

    /// Input number for a source name, receiver names first.
    pub async fn get_input_number_by_name(&self, name: &str) -> Option<u32> {
        self.inner.state.read().await.input_number_by_name(name)
    }

    /// Snapshot of everything folded so far.
    pub async fn state(&self) -> DeviceState {
        self.inner.state.read().await.clone()
    }

    pub async fn zone_state(&self, zone: u8) -> Option<ZoneState> {
        self.inner.state.read().await.zone(zone).cloned()
    }

    /// Parses, folds and emits one received line.
    async fn handle_line(&self, line: &str) {
        let Some(message) = parse_message(line) else {
            trace!(line, "unrecognized line");
            return;
        };
        debug!(line, ?message, "received");

        let update = {
            let mut state = self.inner.state.write().await;
            let outcome = state.fold(&message);
            events::update_for(self.identifier(), outcome, &state)
        };

        if let Some(update) = update {
            self.inner.emitter.emit(&update);
        }
    }

    /// Called by a read loop that ended on EOF or error.
    async fn connection_lost(&self, generation: u64) {
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.inner.writer.lock().await.take();
        self.inner.reader.lock().await.take();
        self.apply_retention().await;
        self.set_status(ConnectionStatus::Disconnected);
    }

    async fn apply_retention(&self) {
        if self.inner.config.retention == RetentionPolicy::Reset {
            self.inner.state.write().await.invalidate_zones();
            debug!(device = %self.identifier(), "zone state reset");
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = self.inner.status_tx.send_replace(status);
        if previous != status {
            debug!(device = %self.identifier(), from = %previous, to = %status, "status changed");
            self.inner
                .emitter
                .emit(&events::availability_update(self.identifier(), status));
        }
    }
}

struct ReadLoop {
    session: DeviceSession,
    generation: u64,
    reader: LineReader<OwnedReadHalf>,
    cancel: watch::Receiver<bool>,
}

impl ReadLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.changed() => {
                    trace!("read loop cancelled");
                    return;
                }
                result = self.reader.next_line() => match result {
                    Ok(Some(line)) => self.session.handle_line(&line).await,
                    Ok(None) => {
                        info!(device = %self.session.identifier(), "connection closed by receiver");
                        break;
                    }
                    Err(e) => {
                        warn!(device = %self.session.identifier(), error = %e, "read failed");
                        break;
                    }
                },
            }
        }
        self.session.connection_lost(self.generation).await;
    }
}
