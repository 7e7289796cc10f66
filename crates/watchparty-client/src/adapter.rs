//! Playback adapter: the engine's view of a concrete media player.

use tokio::sync::mpsc;
use watchparty_core::error::Result;
use watchparty_core::{MediaId, TransportKind};

/// Capability interface over a media player.
///
/// The player reports every transport change (user-driven or programmatic)
/// on an [`AdapterEventSender`]; the engine decides which ones were its own.
#[cfg_attr(test, mockall::automock)]
pub trait PlaybackAdapter: Send {
    /// Current playback position in seconds.
    fn position(&self) -> f64;

    /// Seek to a position in seconds.
    fn set_position(&mut self, secs: f64) -> Result<()>;

    /// Check if the player is paused.
    fn is_paused(&self) -> bool;

    /// Start or resume playback.
    fn play(&mut self) -> Result<()>;

    /// Pause playback.
    fn pause(&mut self) -> Result<()>;

    /// Set the playback rate multiplier (1.0 = normal speed).
    fn set_rate(&mut self, rate: f64) -> Result<()>;

    /// Load a different title or stream.
    fn load(&mut self, media: &MediaId) -> Result<()>;
}

/// Sending half of a player's transport event stream.
pub type AdapterEventSender = mpsc::UnboundedSender<TransportKind>;

/// Receiving half of a player's transport event stream.
pub type AdapterEventReceiver = mpsc::UnboundedReceiver<TransportKind>;

/// Create a transport event channel for a player.
pub fn adapter_events() -> (AdapterEventSender, AdapterEventReceiver) {
    mpsc::unbounded_channel()
}
