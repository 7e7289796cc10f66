//! Headless player that keeps time against a [`LocalClock`].
//!
//! Behaves like a media element: position advances at the playback rate
//! while playing, and every transport change is reported on the event
//! channel whether it came from the engine or from a `user_*` call.

use std::sync::{Arc, Mutex, MutexGuard};
use watchparty_core::error::Result;
use watchparty_core::{AdapterError, MediaId, TransportKind};
use watchparty_timing::LocalClock;
use crate::{AdapterEventSender, PlaybackAdapter};

struct PlayerInner {
    clock: Arc<dyn LocalClock>,
    events: AdapterEventSender,
    /// Position at `anchor_ms`.
    anchor_position: f64,
    anchor_ms: i64,
    paused: bool,
    rate: f64,
    media: Option<MediaId>,
    /// Reject mutations, as a player without loaded media would.
    stalled: bool,
}

impl PlayerInner {
    fn position(&self) -> f64 {
        if self.paused {
            self.anchor_position
        } else {
            let elapsed = (self.clock.now_ms() - self.anchor_ms) as f64 / 1000.0;
            (self.anchor_position + elapsed * self.rate).max(0.0)
        }
    }

    fn rebase(&mut self) {
        self.anchor_position = self.position();
        self.anchor_ms = self.clock.now_ms();
    }

    fn emit(&self, kind: TransportKind) {
        // A closed channel means the session is gone; nothing to notify.
        let _ = self.events.send(kind);
    }

    fn check_ready(&self) -> Result<()> {
        if self.stalled {
            Err(AdapterError::NotReady.into())
        } else {
            Ok(())
        }
    }

    fn seek(&mut self, secs: f64) -> Result<()> {
        self.check_ready()?;
        self.anchor_position = secs.max(0.0);
        self.anchor_ms = self.clock.now_ms();
        self.emit(TransportKind::Seek);
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) -> Result<()> {
        self.check_ready()?;
        if self.paused == paused {
            return Ok(());
        }
        self.rebase();
        self.paused = paused;
        self.emit(if paused { TransportKind::Pause } else { TransportKind::Play });
        Ok(())
    }
}

/// Simulated media player. Clones share one player.
#[derive(Clone)]
pub struct SimulatedPlayer {
    inner: Arc<Mutex<PlayerInner>>,
}

impl SimulatedPlayer {
    /// Create a paused player at 0s reporting to `events`.
    pub fn new(clock: Arc<dyn LocalClock>, events: AdapterEventSender) -> Self {
        let now = clock.now_ms();
        Self {
            inner: Arc::new(Mutex::new(PlayerInner {
                clock,
                events,
                anchor_position: 0.0,
                anchor_ms: now,
                paused: true,
                rate: 1.0,
                media: None,
                stalled: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlayerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// User pressed play.
    pub fn user_play(&self) -> Result<()> {
        self.lock().set_paused(false)
    }

    /// User pressed pause.
    pub fn user_pause(&self) -> Result<()> {
        self.lock().set_paused(true)
    }

    /// User dragged the scrubber.
    pub fn user_seek(&self, secs: f64) -> Result<()> {
        self.lock().seek(secs)
    }

    /// Make every mutation fail with `NotReady` until cleared.
    pub fn set_stalled(&self, stalled: bool) {
        self.lock().stalled = stalled;
    }

    /// Current playback rate.
    pub fn rate(&self) -> f64 {
        self.lock().rate
    }

    /// Loaded media, if any.
    pub fn media(&self) -> Option<MediaId> {
        self.lock().media.clone()
    }
}

impl PlaybackAdapter for SimulatedPlayer {
    fn position(&self) -> f64 {
        self.lock().position()
    }

    fn set_position(&mut self, secs: f64) -> Result<()> {
        self.lock().seek(secs)
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn play(&mut self) -> Result<()> {
        self.lock().set_paused(false)
    }

    fn pause(&mut self) -> Result<()> {
        self.lock().set_paused(true)
    }

    fn set_rate(&mut self, rate: f64) -> Result<()> {
        let mut inner = self.lock();
        inner.check_ready()?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(AdapterError::Rejected(format!("rate {}", rate)).into());
        }
        inner.rebase();
        inner.rate = rate;
        Ok(())
    }

    fn load(&mut self, media: &MediaId) -> Result<()> {
        let mut inner = self.lock();
        inner.media = Some(media.clone());
        inner.anchor_position = 0.0;
        inner.anchor_ms = inner.clock.now_ms();
        inner.paused = true;
        inner.rate = 1.0;
        inner.stalled = false;
        Ok(())
    }
}
