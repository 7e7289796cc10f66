//! Echo suppression for engine-initiated transport changes.
//!
//! Before the engine mutates the player it arms the guard for that verb.
//! The next player event of the same verb is then swallowed exactly once.
//! An arm that is never consumed expires after `window_ms`, so a lost
//! player event cannot mask a later user action.

use watchparty_core::TransportKind;

/// Per-verb suppression flags with bounded lifetime.
#[derive(Debug, Clone)]
pub struct EchoGuard {
    window_ms: i64,
    /// Expiry time (local ms) per verb; `None` = not armed.
    armed: [Option<i64>; 3],
}

impl EchoGuard {
    /// Create a guard whose arms expire after `window_ms`.
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms: window_ms.max(0),
            armed: [None; 3],
        }
    }

    /// Expect one self-caused event of `kind`.
    pub fn arm(&mut self, kind: TransportKind, now_ms: i64) {
        self.armed[kind.index()] = Some(now_ms + self.window_ms);
    }

    /// Forget a pending arm (the mutation it covered failed).
    pub fn disarm(&mut self, kind: TransportKind) {
        self.armed[kind.index()] = None;
    }

    /// Consume the arm for `kind`, if live.
    ///
    /// Returns true if the event was caused by the engine and must not be
    /// propagated.
    pub fn should_suppress(&mut self, kind: TransportKind, now_ms: i64) -> bool {
        match self.armed[kind.index()].take() {
            Some(deadline) => now_ms <= deadline,
            None => false,
        }
    }

    /// Check for a live arm without consuming it.
    pub fn is_armed(&self, kind: TransportKind, now_ms: i64) -> bool {
        matches!(self.armed[kind.index()], Some(deadline) if now_ms <= deadline)
    }

    /// Clear expired arms. Returns how many were cleared.
    pub fn expire(&mut self, now_ms: i64) -> usize {
        let mut cleared = 0;
        for slot in self.armed.iter_mut() {
            if matches!(slot, Some(deadline) if now_ms > *deadline) {
                *slot = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Suppression window in milliseconds.
    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }
}
