//! Sync statistics for monitoring correction activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live engine statistics shared between the session task and its handle.
///
/// All fields are atomic, so reads/writes are lock-free.
#[derive(Debug, Default)]
pub struct SyncStats {
    /// Drift-correction ticks run.
    pub ticks: AtomicU64,
    /// Ticks skipped for lack of a clock estimate or room state.
    pub ticks_skipped: AtomicU64,
    /// Seeks issued because drift exceeded the hard threshold.
    pub hard_resyncs: AtomicU64,
    /// Playback-rate nudges issued.
    pub nudges: AtomicU64,
    /// Player events recognized as our own and swallowed.
    pub echoes_suppressed: AtomicU64,
    /// Player mutations that returned an error.
    pub adapter_failures: AtomicU64,
    /// Clock probes sent.
    pub probes_sent: AtomicU64,
    /// Clock probes answered and accepted.
    pub probes_answered: AtomicU64,
    /// Local user actions broadcast to the room.
    pub local_actions: AtomicU64,
}

impl SyncStats {
    /// Create a new zeroed stats instance.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current stats.
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            hard_resyncs: self.hard_resyncs.load(Ordering::Relaxed),
            nudges: self.nudges.load(Ordering::Relaxed),
            echoes_suppressed: self.echoes_suppressed.load(Ordering::Relaxed),
            adapter_failures: self.adapter_failures.load(Ordering::Relaxed),
            probes_sent: self.probes_sent.load(Ordering::Relaxed),
            probes_answered: self.probes_answered.load(Ordering::Relaxed),
            local_actions: self.local_actions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sync statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    pub ticks: u64,
    pub ticks_skipped: u64,
    pub hard_resyncs: u64,
    pub nudges: u64,
    pub echoes_suppressed: u64,
    pub adapter_failures: u64,
    pub probes_sent: u64,
    pub probes_answered: u64,
    pub local_actions: u64,
}

impl SyncStatsSnapshot {
    /// Probe loss rate as a percentage (unanswered / sent * 100).
    pub fn probe_loss_percent(&self) -> f64 {
        if self.probes_sent == 0 {
            0.0
        } else {
            let lost = self.probes_sent.saturating_sub(self.probes_answered);
            (lost as f64 / self.probes_sent as f64) * 100.0
        }
    }
}
