//! One-shot reachability probe used when adding a receiver.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::session::DeviceSession;

/// Timing of the probe.
#[derive(Debug, Clone)]
pub struct ProbeTiming {
    /// Pause between the model and power queries.
    pub query_gap: Duration,
    /// How long to wait for the model answer.
    pub answer_window: Duration,
    pub poll_interval: Duration,
}

impl Default for ProbeTiming {
    fn default() -> Self {
        Self {
            query_gap: Duration::from_millis(200),
            answer_window: Duration::from_secs(3),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Outcome of [`verify_device`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub host: String,
    pub port: u16,
    pub connected: bool,
    /// Model reported by the receiver within the answer window.
    pub model: Option<String>,
    pub error: Option<String>,
}

impl VerifyReport {
    /// True when the receiver accepted the connection and answered.
    pub fn is_verified(&self) -> bool {
        self.connected && self.model.is_some()
    }
}

/// Connects once, asks for the model and power state, and waits for the
/// model answer. Always disconnects before returning.
pub async fn verify_device(config: DeviceConfig) -> VerifyReport {
    verify_device_with(config, ProbeTiming::default()).await
}

pub async fn verify_device_with(config: DeviceConfig, timing: ProbeTiming) -> VerifyReport {
    let mut report = VerifyReport {
        host: config.host.clone(),
        port: config.port,
        connected: false,
        model: None,
        error: None,
    };

    let session = match DeviceSession::new(config) {
        Ok(session) => session,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };

    info!(host = %report.host, port = report.port, "probing receiver");
    if let Err(e) = session.connect().await {
        warn!(host = %report.host, error = %e, "probe connect failed");
        report.error = Some(e.to_string());
        return report;
    }
    report.connected = true;

    session.query_model().await;
    sleep(timing.query_gap).await;
    if let Err(e) = session.query_power(1).await {
        debug!(error = %e, "power query rejected");
    }

    let deadline = Instant::now() + timing.answer_window;
    loop {
        if let Some(model) = session
            .get_cached_state("model")
            .await
            .and_then(|v| v.as_str().map(str::to_string))
        {
            info!(host = %report.host, model = %model, "receiver answered");
            report.model = Some(model);
            break;
        }
        if Instant::now() >= deadline {
            warn!(host = %report.host, "receiver did not report its model");
            report.error = Some("no response from receiver".to_string());
            break;
        }
        sleep(timing.poll_interval).await;
    }

    session.disconnect().await;
    report
}
