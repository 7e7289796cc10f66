//! Session events and handlers.

use async_trait::async_trait;
use watchparty_core::{MediaId, TransportKind};
use crate::{PeerInfo, RoomState};

/// Events emitted by a sync session for the embedding UI.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Relay link established and room joined.
    Connected,
    /// Relay link lost.
    Disconnected,
    /// The room switched to different media.
    MediaChanged { media: MediaId, title: String },
    /// A full-state pull replaced the room record.
    StateSynced(RoomState),
    /// A local user action was broadcast to the room.
    LocalAction { kind: TransportKind, position: f64 },
    /// A remote transport command was applied.
    RemoteAction { kind: TransportKind, position: f64 },
    /// Chat line from the room.
    Chat { username: String, message: String },
    /// Telemetry from another member.
    PeerStats(PeerInfo),
}

/// Handler for session events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    async fn on_event(&self, event: SessionEvent);
}

/// No-op event handler.
pub struct NoOpHandler;

#[async_trait]
impl EventHandler for NoOpHandler {
    async fn on_event(&self, _event: SessionEvent) {}
}

/// Callback-based event handler.
pub struct CallbackHandler<F>
where
    F: Fn(SessionEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(SessionEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(SessionEvent) + Send + Sync,
{
    async fn on_event(&self, event: SessionEvent) {
        (self.callback)(event);
    }
}
