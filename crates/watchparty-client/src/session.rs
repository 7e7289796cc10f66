//! Session task: runs a [`SyncController`] against a relay link.
//!
//! One task owns the controller and serializes every input through a
//! single `select!`, so a remote command, a player event and a tick never
//! observe each other half-applied.
//!
//! Outbound messages produced while the link is down are discarded, so the
//! first message on every new socket is the `joinRoom` queued by
//! [`SyncController::on_connected`].

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use watchparty_core::error::{Result, TransportError};
use crate::relay::{RelayEvent, RelayLink};
use crate::{
    AdapterEventReceiver, EventHandler, PlaybackAdapter, SyncController, SyncStats,
    SyncStatsSnapshot,
};

/// Requests from the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Send a chat line to the room.
    Chat(String),
    /// Pull full room state now.
    RequestSync,
}

/// Handle to a running session.
pub struct SessionHandle {
    shutdown_tx: watch::Sender<bool>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    stats: Arc<SyncStats>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub(crate) fn spawn<A: PlaybackAdapter + 'static>(
        controller: SyncController<A>,
        adapter_events: AdapterEventReceiver,
        link: RelayLink,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        let stats = Arc::clone(controller.stats());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (commands, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(
            controller,
            adapter_events,
            link,
            handler,
            command_rx,
            shutdown_rx,
        ));

        Self {
            shutdown_tx,
            commands,
            stats,
            task: Some(task),
        }
    }

    /// Send a chat line to the room.
    pub fn send_chat(&self, message: impl Into<String>) -> Result<()> {
        self.command(SessionCommand::Chat(message.into()))
    }

    /// Pull full room state without waiting for the periodic pull.
    pub fn request_sync(&self) -> Result<()> {
        self.command(SessionCommand::RequestSync)
    }

    fn command(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| TransportError::Closed.into())
    }

    /// Current engine statistics.
    pub fn stats(&self) -> SyncStatsSnapshot {
        self.stats.snapshot()
    }

    /// Check if the session task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the session and wait for it to finish.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

async fn run<A: PlaybackAdapter>(
    mut controller: SyncController<A>,
    mut adapter_events: AdapterEventReceiver,
    mut link: RelayLink,
    handler: Arc<dyn EventHandler>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let tick_period = controller.config().tick_interval;
    let ping_period = controller.config().ping_interval;
    let mut tick = interval_at(Instant::now() + tick_period, tick_period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ping = interval_at(Instant::now() + ping_period, ping_period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut connected = false;
    info!(room = %controller.room_id(), user = %controller.username(), "Sync session started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => break,

            Some(kind) = adapter_events.recv() => {
                controller.handle_adapter_event(kind);
            }

            event = link.inbound.recv() => match event {
                Some(RelayEvent::Connected) => {
                    connected = true;
                    controller.on_connected();
                }
                Some(RelayEvent::Disconnected) => {
                    connected = false;
                    controller.on_disconnected();
                }
                Some(RelayEvent::Message(message)) => controller.handle_message(message),
                None => {
                    warn!("Relay link closed, ending session");
                    break;
                }
            },

            Some(command) = commands.recv() => match command {
                SessionCommand::Chat(text) => controller.send_chat(text),
                SessionCommand::RequestSync => controller.request_full_sync(),
            },

            _ = tick.tick() => {
                let outcome = controller.tick();
                debug!(?outcome, "Tick");
            }

            _ = ping.tick() => {
                if connected {
                    controller.send_probe();
                }
            }
        }

        flush(&mut controller, &link, handler.as_ref(), connected).await;
    }

    info!(room = %controller.room_id(), "Sync session stopped");
}

async fn flush<A: PlaybackAdapter>(
    controller: &mut SyncController<A>,
    link: &RelayLink,
    handler: &dyn EventHandler,
    connected: bool,
) {
    let outbound = controller.drain_outbound();
    if connected {
        for message in outbound {
            if link.outbound.send(message).is_err() {
                warn!("Relay link gone, dropping outbound message");
                break;
            }
        }
    } else if !outbound.is_empty() {
        debug!(dropped = outbound.len(), "Relay link down, discarding outbound messages");
    }
    for event in controller.drain_events() {
        handler.on_event(event).await;
    }
}
