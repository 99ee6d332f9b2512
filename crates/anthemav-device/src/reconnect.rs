//! Reconnect supervisor.
//!
//! Keeps a session connected: connects with exponential backoff and jitter,
//! refreshes status after every successful connect, then waits for the
//! connection to drop and starts over. Cancelled through a watch channel.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{DeviceError, DeviceResult};
use crate::session::{ConnectionStatus, DeviceSession};

/// Backoff configuration for reconnect attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any delay.
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Jitter added to every delay (fraction 0.0-1.0).
    pub jitter_fraction: f64,
    /// Give up after this many consecutive failures; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_fraction: 0.1,
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Builder: set backoff parameters.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.multiplier = multiplier;
        self
    }

    /// Builder: set jitter fraction.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> DeviceResult<()> {
        if self.multiplier < 1.0 {
            return Err(DeviceError::config("reconnect multiplier must be >= 1.0"));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(DeviceError::config(
                "max_backoff must not be smaller than initial_backoff",
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err(DeviceError::config("jitter_fraction must be within 0.0..=1.0"));
        }
        Ok(())
    }

    /// Backoff without jitter for the given number of consecutive failures.
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_backoff.as_secs_f64();
        let exponent = (consecutive_failures - 1).min(i32::MAX as u32) as i32;
        let delay = base * self.multiplier.powi(exponent);
        let max = self.max_backoff.as_secs_f64();

        Duration::from_secs_f64(delay.min(max))
    }

    /// Backoff with jitter applied, never above `max_backoff`.
    pub fn next_delay(&self, consecutive_failures: u32) -> Duration {
        let base = self.backoff_delay(consecutive_failures).as_secs_f64();
        let jitter = rand_jitter(base * self.jitter_fraction);
        let max = self.max_backoff.as_secs_f64();
        Duration::from_secs_f64((base + jitter).clamp(0.0, max))
    }

    /// Returns true once `consecutive_failures` exhausts `max_attempts`.
    pub fn exhausted(&self, consecutive_failures: u32) -> bool {
        self.max_attempts
            .is_some_and(|max| consecutive_failures >= max)
    }
}

/// Pseudo-random value in `[-range, range]` derived from the clock.
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    let fraction = (nanos as f64) / 1_000_000_000.0;
    (fraction * 2.0 - 1.0) * range
}

/// Runs until cancelled or until `max_attempts` is exhausted.
pub(crate) async fn supervise(session: DeviceSession, mut cancel: watch::Receiver<bool>) {
    let config = session.config().reconnect.clone();
    let mut status = session.status();
    let mut failures: u32 = 0;

    info!(device = %session.identifier(), "reconnect supervisor started");

    loop {
        if *cancel.borrow() {
            break;
        }

        match session.connect().await {
            Ok(()) => {
                if failures > 0 {
                    info!(device = %session.identifier(), attempts = failures + 1, "reconnected");
                }
                failures = 0;
                session.refresh_status().await;

                tokio::select! {
                    _ = wait_for_disconnect(&mut status) => {
                        warn!(device = %session.identifier(), "connection lost");
                    }
                    _ = cancel.changed() => break,
                }
            }
            Err(e) => {
                failures += 1;
                if config.exhausted(failures) {
                    error!(
                        device = %session.identifier(),
                        failures,
                        error = %e,
                        "giving up on reconnect"
                    );
                    break;
                }

                let delay = config.next_delay(failures);
                warn!(
                    device = %session.identifier(),
                    failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "connect failed, retrying"
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.changed() => break,
                }
            }
        }
    }

    debug!(device = %session.identifier(), "reconnect supervisor stopped");
}

async fn wait_for_disconnect(status: &mut watch::Receiver<ConnectionStatus>) {
    // sender lives as long as the session, so an error only happens on teardown
    let _ = status
        .wait_for(|s| *s == ConnectionStatus::Disconnected)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.max_backoff, Duration::from_secs(60));
        assert_eq!(config.max_attempts, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let config = ReconnectConfig::default().with_backoff(
            Duration::from_secs(1),
            Duration::from_secs(30),
            2.0,
        );

        assert_eq!(config.backoff_delay(0), Duration::ZERO);
        assert_eq!(config.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(config.backoff_delay(10), Duration::from_secs(30));
        assert_eq!(config.backoff_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_fraction() {
        let config = ReconnectConfig::default()
            .with_backoff(Duration::from_secs(10), Duration::from_secs(60), 2.0)
            .with_jitter(0.1);

        for _ in 0..20 {
            let delay = config.next_delay(1).as_secs_f64();
            assert!((9.0..=11.0).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn jitter_never_exceeds_max() {
        let config = ReconnectConfig::default()
            .with_backoff(Duration::from_secs(1), Duration::from_secs(5), 2.0)
            .with_jitter(1.0);
        for failures in 1..10 {
            assert!(config.next_delay(failures) <= Duration::from_secs(5));
        }
    }

    #[test]
    fn max_attempts() {
        let unlimited = ReconnectConfig::default();
        assert!(!unlimited.exhausted(1_000));

        let limited = ReconnectConfig::default().with_max_attempts(Some(3));
        assert!(!limited.exhausted(2));
        assert!(limited.exhausted(3));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let shrinking = ReconnectConfig::default().with_backoff(
            Duration::from_secs(1),
            Duration::from_secs(10),
            0.5,
        );
        assert!(shrinking.validate().is_err());

        let inverted = ReconnectConfig::default().with_backoff(
            Duration::from_secs(10),
            Duration::from_secs(1),
            2.0,
        );
        assert!(inverted.validate().is_err());
    }
}
