//! Relay clock synchronization over `pingCheck`/`pongCheck`.
//!
//! A probe carries the local send time; the relay echoes it back together
//! with its own wall clock at receipt. From one round trip:
//!
//! - RTT = t_recv - t_sent
//! - latency = RTT / 2
//! - offset = (server_time + latency) - t_recv
//!
//! Only the last estimate is kept. A lost probe simply never produces a
//! pong, so the previous estimate stays in force.

use std::sync::Arc;
use tracing::{debug, warn};
use watchparty_core::error::{Result, TimingError};
use watchparty_core::{PingCheck, PongCheck};
use crate::{ClockEstimate, LocalClock};

/// Estimate from a single round trip.
pub fn estimate_from_round_trip(
    client_sent: i64,
    server_time: i64,
    local_receive: i64,
) -> Result<ClockEstimate> {
    let rtt_ms = local_receive - client_sent;
    if rtt_ms < 0 {
        return Err(TimingError::NegativeRoundTrip { rtt_ms }.into());
    }
    let latency_ms = rtt_ms as f64 / 2.0;
    let offset_ms = (server_time as f64 + latency_ms) - local_receive as f64;
    Ok(ClockEstimate {
        offset_ms,
        latency_ms,
        rtt_ms,
    })
}

/// Relay clock estimator.
pub struct ClockSync {
    clock: Arc<dyn LocalClock>,
    estimate: Option<ClockEstimate>,
    /// EMA weight of a new sample; `None` keeps the raw last sample.
    smoothing: Option<f64>,
}

impl ClockSync {
    /// Create an estimator with no estimate yet.
    pub fn new(clock: Arc<dyn LocalClock>) -> Self {
        Self {
            clock,
            estimate: None,
            smoothing: None,
        }
    }

    /// Blend new samples into the estimate with weight `alpha` in (0, 1).
    pub fn with_smoothing(mut self, alpha: f64) -> Self {
        self.smoothing = if alpha > 0.0 && alpha < 1.0 { Some(alpha) } else { None };
        self
    }

    /// Build the next probe, stamped with the local clock.
    pub fn probe(&self) -> PingCheck {
        PingCheck {
            client_time: self.clock.now_ms(),
        }
    }

    /// Fold a pong into the estimate.
    ///
    /// On error the previous estimate is retained.
    pub fn on_pong(&mut self, pong: &PongCheck) -> Result<ClockEstimate> {
        let local_receive = self.clock.now_ms();
        let sample = match estimate_from_round_trip(pong.client_sent, pong.server_time, local_receive) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Discarding clock probe: {}", e);
                return Err(e);
            }
        };

        let estimate = match (self.estimate, self.smoothing) {
            (Some(prev), Some(alpha)) => ClockEstimate {
                offset_ms: prev.offset_ms + alpha * (sample.offset_ms - prev.offset_ms),
                latency_ms: prev.latency_ms + alpha * (sample.latency_ms - prev.latency_ms),
                rtt_ms: sample.rtt_ms,
            },
            _ => sample,
        };

        debug!(
            offset_ms = estimate.offset_ms,
            latency_ms = estimate.latency_ms,
            rtt_ms = sample.rtt_ms,
            "Clock estimate updated"
        );
        self.estimate = Some(estimate);
        Ok(estimate)
    }

    /// Last successful estimate.
    pub fn estimate(&self) -> Option<ClockEstimate> {
        self.estimate
    }

    /// Check if at least one probe has completed.
    pub fn is_synchronized(&self) -> bool {
        self.estimate.is_some()
    }

    /// Estimated one-way latency, zero before the first estimate.
    pub fn latency_ms(&self) -> f64 {
        self.estimate.map(|e| e.latency_ms).unwrap_or(0.0)
    }

    /// Current relay time, if an estimate exists.
    pub fn now(&self) -> Option<i64> {
        self.estimate.map(|e| e.local_to_relay(self.clock.now_ms()))
    }

    /// Local clock reading.
    pub fn local_now(&self) -> i64 {
        self.clock.now_ms()
    }
}
