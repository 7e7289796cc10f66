//! Tuning for the synchronization engine.

use std::time::Duration;
use watchparty_core::{Error, Result};

/// Drift-correction and probing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Drift-correction period.
    pub tick_interval: Duration,
    /// Clock probe period.
    pub ping_interval: Duration,
    /// Pull full state from the relay every N ticks.
    pub full_sync_every_ticks: u64,
    /// Drift (seconds) above which the player is seeked instead of nudged.
    pub hard_threshold_secs: f64,
    /// Rate change per second of drift.
    pub nudge_gain: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    /// Lifetime of an unconsumed echo-guard arm.
    pub echo_window: Duration,
    /// Distance (seconds) at which a remote play/pause also seeks.
    pub seek_tolerance_secs: f64,
    /// EMA weight for clock samples; `None` keeps the raw last sample.
    pub clock_smoothing: Option<f64>,
    /// Reported in `statsUpdate`.
    pub platform: String,
    /// Peers silent for longer than this are dropped on the full-sync cadence.
    pub peer_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            ping_interval: Duration::from_millis(1000),
            full_sync_every_ticks: 5,
            hard_threshold_secs: 1.0,
            nudge_gain: 0.1,
            min_rate: 0.95,
            max_rate: 1.05,
            echo_window: Duration::from_millis(1000),
            seek_tolerance_secs: 0.5,
            clock_smoothing: None,
            platform: std::env::consts::OS.to_string(),
            peer_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Playback rate that closes `diff` seconds of drift.
    pub fn nudge_rate(&self, diff: f64) -> f64 {
        (1.0 + diff * self.nudge_gain).clamp(self.min_rate, self.max_rate)
    }

    /// Peer timeout in milliseconds.
    pub fn peer_timeout_ms(&self) -> i64 {
        self.peer_timeout.as_millis() as i64
    }

    /// Echo window in milliseconds.
    pub fn echo_window_ms(&self) -> i64 {
        self.echo_window.as_millis() as i64
    }

    /// Reject settings the session loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() || self.ping_interval.is_zero() {
            return Err(Error::InvalidConfig("intervals must be non-zero".into()));
        }
        if !(self.hard_threshold_secs > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "hard threshold {} must be positive",
                self.hard_threshold_secs
            )));
        }
        if !(self.min_rate > 0.0 && self.min_rate <= 1.0 && self.max_rate >= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "rate bounds [{}, {}] must bracket 1.0",
                self.min_rate, self.max_rate
            )));
        }
        if !(self.nudge_gain.is_finite() && self.nudge_gain >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "nudge gain {} must be finite and non-negative",
                self.nudge_gain
            )));
        }
        if let Some(alpha) = self.clock_smoothing {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(Error::InvalidConfig(format!("clock smoothing {} outside (0, 1)", alpha)));
            }
        }
        Ok(())
    }
}
