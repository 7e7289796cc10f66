//! Relay wire messages.
//!
//! Every message travels as one JSON text frame of the form
//! `{"type": "<event>", "data": {...}}`. Payload keys are camelCase and fixed
//! for compatibility with existing relays.

use serde::{Deserialize, Serialize};
use crate::error::{ProtocolError, Result};
use crate::media::{MediaId, TransportKind};

/// `joinRoom` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: String,
    pub username: String,
}

/// `pingCheck` payload: local wall clock at send, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingCheck {
    pub client_time: i64,
}

/// `pongCheck` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongCheck {
    /// `clientTime` of the ping, echoed unchanged.
    pub client_sent: i64,
    /// Relay wall clock when the ping arrived.
    pub server_time: i64,
}

/// Payload shared by `play`, `pause` and `seek`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCommand {
    pub room_id: String,
    /// Playback position in seconds.
    pub time: f64,
}

/// `getState` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetState {
    pub room_id: String,
}

/// `syncState` payload: the relay's authoritative record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub current_time: f64,
    pub paused: bool,
    /// Relay wall clock (ms) at which `current_time` was true.
    pub last_update: i64,
}

/// `statsUpdate` payload. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUpdate {
    pub username: String,
    /// One-way latency estimate in milliseconds.
    pub latency: f64,
    /// Sender's local playback position in seconds.
    pub time: f64,
    pub platform: String,
}

/// `init` payload, sent once by the relay after `joinRoom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Init {
    pub video_url: MediaId,
    #[serde(default)]
    pub title: String,
    pub current_time: f64,
    pub paused: bool,
    pub last_update: i64,
}

/// `chat` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub room_id: String,
    pub username: String,
    pub message: String,
}

/// A message exchanged with the relay, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Message {
    JoinRoom(JoinRoom),
    PingCheck(PingCheck),
    PongCheck(PongCheck),
    Play(TransportCommand),
    Pause(TransportCommand),
    Seek(TransportCommand),
    GetState(GetState),
    SyncState(SyncState),
    StatsUpdate(StatsUpdate),
    Init(Init),
    Chat(Chat),
}

impl Message {
    /// Build a `play`/`pause`/`seek` message.
    pub fn transport(kind: TransportKind, room_id: impl Into<String>, time: f64) -> Self {
        let command = TransportCommand {
            room_id: room_id.into(),
            time,
        };
        match kind {
            TransportKind::Play => Message::Play(command),
            TransportKind::Pause => Message::Pause(command),
            TransportKind::Seek => Message::Seek(command),
        }
    }

    /// Split a transport message into its verb and payload.
    pub fn as_transport(&self) -> Option<(TransportKind, &TransportCommand)> {
        match self {
            Message::Play(c) => Some((TransportKind::Play, c)),
            Message::Pause(c) => Some((TransportKind::Pause, c)),
            Message::Seek(c) => Some((TransportKind::Seek, c)),
            _ => None,
        }
    }

    /// Wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Message::JoinRoom(_) => "joinRoom",
            Message::PingCheck(_) => "pingCheck",
            Message::PongCheck(_) => "pongCheck",
            Message::Play(_) => "play",
            Message::Pause(_) => "pause",
            Message::Seek(_) => "seek",
            Message::GetState(_) => "getState",
            Message::SyncState(_) => "syncState",
            Message::StatsUpdate(_) => "statsUpdate",
            Message::Init(_) => "init",
            Message::Chat(_) => "chat",
        }
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let message: Message = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Reject payloads that would poison playback state.
    fn validate(&self) -> Result<()> {
        let time = match self {
            Message::Play(c) | Message::Pause(c) | Message::Seek(c) => c.time,
            Message::SyncState(s) => s.current_time,
            Message::Init(i) => i.current_time,
            _ => return Ok(()),
        };
        if !time.is_finite() || time < 0.0 {
            return Err(ProtocolError::InvalidValue(format!(
                "{}: position {}",
                self.event_name(),
                time
            ))
            .into());
        }
        Ok(())
    }
}
