//! Authoritative shared playback record for a room.

use watchparty_core::{MediaId, SyncState, TransportKind};

/// The room's playback record, stamped with relay time.
///
/// `position` is only meaningful together with `paused` and
/// `last_update_at`: while playing, the true position keeps advancing from
/// `position` at one second per second of relay time.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomState {
    /// Currently loaded title, if the relay announced one.
    pub media: Option<MediaId>,
    /// Display title of the media.
    pub title: String,
    /// Playback offset in seconds as of `last_update_at`.
    pub position: f64,
    pub paused: bool,
    /// Relay-clock timestamp (ms) at which `position`/`paused` became true.
    pub last_update_at: i64,
}

impl RoomState {
    /// Record seeded from a full-state pull.
    pub fn new(position: f64, paused: bool, last_update_at: i64) -> Self {
        Self {
            media: None,
            title: String::new(),
            position,
            paused,
            last_update_at,
        }
    }

    /// Record seeded from a `syncState` response.
    pub fn from_sync(state: &SyncState) -> Self {
        Self::new(state.current_time, state.paused, state.last_update)
    }

    /// True current position at `relay_now`.
    pub fn current_position(&self, relay_now: i64) -> f64 {
        self.projected_position(relay_now, 0.0)
    }

    /// Position expected at `relay_now`, less the one-way delay already
    /// incurred before this client observed the record.
    pub fn projected_position(&self, relay_now: i64, latency_ms: f64) -> f64 {
        if self.paused {
            self.position
        } else {
            let elapsed_ms = (relay_now - self.last_update_at) as f64 - latency_ms;
            self.position + elapsed_ms / 1000.0
        }
    }

    pub fn apply_remote_play(&mut self, position: f64, relay_now: i64) {
        self.paused = false;
        self.position = position;
        self.last_update_at = relay_now;
    }

    pub fn apply_remote_pause(&mut self, position: f64, relay_now: i64) {
        self.paused = true;
        self.position = position;
        self.last_update_at = relay_now;
    }

    /// Move the position; the paused flag is unchanged.
    pub fn apply_remote_seek(&mut self, position: f64, relay_now: i64) {
        self.position = position;
        self.last_update_at = relay_now;
    }

    /// Unconditionally overwrite the record. Idempotent.
    pub fn apply_remote_full_sync(&mut self, position: f64, paused: bool, relay_now: i64) {
        self.position = position;
        self.paused = paused;
        self.last_update_at = relay_now;
    }

    /// Replace the media identity. Returns true if it changed.
    pub fn set_media(&mut self, media: MediaId, title: String) -> bool {
        let changed = self.media.as_ref() != Some(&media);
        self.media = Some(media);
        self.title = title;
        changed
    }

    /// Mirror a transport change the local user made.
    pub fn record_local_user_action(&mut self, kind: TransportKind, position: f64, relay_now: i64) {
        match kind {
            TransportKind::Play => self.apply_remote_play(position, relay_now),
            TransportKind::Pause => self.apply_remote_pause(position, relay_now),
            TransportKind::Seek => self.apply_remote_seek(position, relay_now),
        }
    }
}
