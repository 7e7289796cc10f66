//! # watchparty-client
//!
//! Playback synchronization engine for watch parties.
//!
//! This crate provides:
//! - A [`PlaybackAdapter`] capability interface over any media player
//! - Echo suppression for transport changes the engine itself caused
//! - Drift correction by playback-rate nudges and hard resyncs
//! - A session task that joins a room over a relay and rejoins on reconnect
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use watchparty_client::{adapter_events, RelayConnection, RelayOptions, SessionBuilder, SimulatedPlayer};
//! use watchparty_timing::SystemClock;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (events_tx, events_rx) = adapter_events();
//!     let player = SimulatedPlayer::new(Arc::new(SystemClock), events_tx);
//!
//!     let (mut relay, link) = RelayConnection::spawn(RelayOptions::new("ws://localhost:3000"))?;
//!     let mut session = SessionBuilder::new("movie-night", "ana").spawn(player, events_rx, link)?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     session.stop().await;
//!     relay.stop().await;
//!     Ok(())
//! }
//! ```

mod adapter;
mod builder;
mod config;
mod controller;
mod echo_guard;
mod events;
mod peers;
mod relay;
mod room_state;
mod session;
mod simulated;
mod stats;

pub use adapter::{adapter_events, AdapterEventReceiver, AdapterEventSender, PlaybackAdapter};
pub use builder::SessionBuilder;
pub use config::SyncConfig;
pub use controller::{SkipReason, SyncController, TickOutcome};
pub use echo_guard::EchoGuard;
pub use events::{CallbackHandler, EventHandler, NoOpHandler, SessionEvent};
pub use peers::{PeerInfo, PeerTable};
pub use relay::{RelayConnection, RelayEndpoint, RelayEvent, RelayLink, RelayOptions};
pub use room_state::RoomState;
pub use session::{SessionCommand, SessionHandle};
pub use simulated::SimulatedPlayer;
pub use stats::{SyncStats, SyncStatsSnapshot};

// Re-export commonly used types
pub use watchparty_core::{Error, MediaId, Message, Result, TransportKind};
pub use watchparty_timing::{ClockSync, LocalClock, ManualClock, SystemClock};
