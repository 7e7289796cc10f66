//! Error types for the watch party engine.

use thiserror::Error;

/// Primary error type for all watch party operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Timing error: {0}")]
    Timing(#[from] TimingError),

    #[error("Playback adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Relay transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation timed out")]
    Timeout,
}

/// Errors while estimating the relay clock.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimingError {
    #[error("Negative round trip: {rtt_ms} ms")]
    NegativeRoundTrip { rtt_ms: i64 },
}

/// Errors raised by the media player behind a playback adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Media not ready")]
    NotReady,

    #[error("Player rejected the request: {0}")]
    Rejected(String),

    #[error("Failed to load media: {0}")]
    LoadFailed(String),

    #[error("Player does not support {0}")]
    Unsupported(&'static str),
}

/// Errors decoding or interpreting relay messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Errors on the link to the relay.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Relay link closed")]
    Closed,

    #[error("No relay URL configured")]
    NotConfigured,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Protocol(ProtocolError::Malformed(err.to_string()))
    }
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
