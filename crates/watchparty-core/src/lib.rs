//! # watchparty-core
//!
//! Core types and error definitions shared across the watch party crates.
//!
//! This crate provides:
//! - Media identity and the transport verbs (`seek`, `play`, `pause`)
//! - The relay wire messages and their JSON encoding
//! - Common error types

pub mod error;
pub mod media;
pub mod message;

pub use error::{AdapterError, Error, ProtocolError, Result, TimingError, TransportError};
pub use media::{MediaId, TransportKind};
pub use message::{
    Chat, GetState, Init, JoinRoom, Message, PingCheck, PongCheck, StatsUpdate, SyncState,
    TransportCommand,
};
