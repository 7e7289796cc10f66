//! Clock implementations and the relay clock estimate.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use crate::LocalClock;

/// Offset and latency between this client and the relay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockEstimate {
    /// Relay clock minus local clock, in milliseconds (positive = relay ahead).
    pub offset_ms: f64,
    /// Estimated one-way network delay (half the round trip), in milliseconds.
    pub latency_ms: f64,
    /// Round-trip time of the probe that produced this estimate.
    pub rtt_ms: i64,
}

impl ClockEstimate {
    /// Apply the offset to a local timestamp.
    pub fn local_to_relay(&self, local_ms: i64) -> i64 {
        local_ms + self.offset_ms.round() as i64
    }
}

/// Current Unix time in milliseconds.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as i64
}

/// The host's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl LocalClock for SystemClock {
    fn now_ms(&self) -> i64 {
        unix_millis()
    }
}

/// Hand-driven clock for simulations and tests.
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`.
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl LocalClock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
