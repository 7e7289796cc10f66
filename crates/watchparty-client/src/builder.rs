//! Session builder for configuration.

use std::sync::Arc;
use std::time::Duration;
use watchparty_core::Result;
use watchparty_timing::{LocalClock, SystemClock};
use crate::relay::RelayLink;
use crate::{
    AdapterEventReceiver, EventHandler, NoOpHandler, PlaybackAdapter, SessionHandle,
    SyncConfig, SyncController, SyncStats,
};

/// Builder for a sync session.
pub struct SessionBuilder {
    room_id: String,
    username: String,
    config: SyncConfig,
    clock: Option<Arc<dyn LocalClock>>,
    event_handler: Option<Arc<dyn EventHandler>>,
    stats: Option<Arc<SyncStats>>,
}

impl SessionBuilder {
    /// Create a builder for `username` joining `room_id`.
    pub fn new(room_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            username: username.into(),
            config: SyncConfig::default(),
            clock: None,
            event_handler: None,
            stats: None,
        }
    }

    /// Replace the whole sync configuration.
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the drift-correction period.
    ///
    /// Also sets the echo window to one tick.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self.config.echo_window = interval;
        self
    }

    /// Set the drift (seconds) above which the player is seeked.
    pub fn hard_threshold(mut self, secs: f64) -> Self {
        self.config.hard_threshold_secs = secs;
        self
    }

    /// Smooth clock samples with an EMA of weight `alpha`.
    pub fn clock_smoothing(mut self, alpha: f64) -> Self {
        self.config.clock_smoothing = Some(alpha);
        self
    }

    /// Set the platform string reported to peers.
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.config.platform = platform.into();
        self
    }

    /// Use a custom local clock (defaults to the system clock).
    pub fn clock(mut self, clock: Arc<dyn LocalClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set event handler.
    pub fn event_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.event_handler = Some(Arc::new(handler));
        self
    }

    /// Share a statistics block with the caller.
    pub fn stats(mut self, stats: Arc<SyncStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Build a controller without spawning a session task.
    pub fn build_controller<A: PlaybackAdapter>(&self, adapter: A) -> Result<SyncController<A>> {
        let clock = self
            .clock
            .clone()
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn LocalClock>);
        let controller = SyncController::new(
            self.config.clone(),
            self.room_id.clone(),
            self.username.clone(),
            adapter,
            clock,
        )?;
        Ok(match &self.stats {
            Some(stats) => controller.with_stats(Arc::clone(stats)),
            None => controller,
        })
    }

    /// Spawn the session task. Must be called within a tokio runtime.
    pub fn spawn<A: PlaybackAdapter + 'static>(
        self,
        adapter: A,
        adapter_events: AdapterEventReceiver,
        link: RelayLink,
    ) -> Result<SessionHandle> {
        let controller = self.build_controller(adapter)?;
        let handler = self
            .event_handler
            .unwrap_or_else(|| Arc::new(NoOpHandler) as Arc<dyn EventHandler>);
        Ok(SessionHandle::spawn(controller, adapter_events, link, handler))
    }
}
