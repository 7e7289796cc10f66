//! WebSocket link to the relay.
//!
//! A background task owns the socket, reconnecting with a fixed delay.
//! The session talks to it over a [`RelayLink`] channel pair, so the engine
//! never sees the socket and tests can stand in an in-memory relay.
//!
//! The relay does not replay missed broadcasts, and neither does this link:
//! messages queued while disconnected are discarded on reconnect, and the
//! session re-pulls full state instead.
//!
//! Ordering on a new socket: stale messages are drained before
//! [`RelayEvent::Connected`] is sent, and the session itself discards
//! anything it produces until it handles `Connected`. The first frame on
//! every socket is therefore `joinRoom`.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use watchparty_core::error::{Result, TransportError};
use watchparty_core::Message;

/// Relay connection options.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Relay URL (e.g. ws://relay.example.com:3000/ws).
    pub url: String,
    /// Delay before reconnecting after the link drops.
    pub reconnect_interval: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_interval: Duration::from_secs(5),
        }
    }
}

impl RelayOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Link status changes and inbound traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Connected (or reconnected) to the relay.
    Connected,
    /// Connection lost; a reconnect follows.
    Disconnected,
    /// Message from the relay.
    Message(Message),
}

/// Session side of a relay link.
pub struct RelayLink {
    pub outbound: mpsc::UnboundedSender<Message>,
    pub inbound: mpsc::UnboundedReceiver<RelayEvent>,
}

/// Relay side of a relay link.
pub struct RelayEndpoint {
    pub outbound: mpsc::UnboundedReceiver<Message>,
    pub inbound: mpsc::UnboundedSender<RelayEvent>,
}

impl RelayLink {
    /// Create a connected link/endpoint pair.
    pub fn pair() -> (RelayLink, RelayEndpoint) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            RelayLink {
                outbound: out_tx,
                inbound: in_rx,
            },
            RelayEndpoint {
                outbound: out_rx,
                inbound: in_tx,
            },
        )
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Background WebSocket connection to the relay.
pub struct RelayConnection {
    shutdown_tx: watch::Sender<bool>,
    task_handle: Option<JoinHandle<()>>,
}

impl RelayConnection {
    /// Start connecting. Returns the link to hand to a session.
    pub fn spawn(options: RelayOptions) -> Result<(Self, RelayLink)> {
        if options.url.is_empty() {
            return Err(TransportError::NotConfigured.into());
        }

        let (link, endpoint) = RelayLink::pair();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task_handle = tokio::spawn(async move {
            Self::run_loop(options, endpoint, shutdown_rx).await;
        });

        Ok((
            Self {
                shutdown_tx,
                task_handle: Some(task_handle),
            },
            link,
        ))
    }

    /// Close the socket and stop reconnecting.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        info!("Relay connection stopped");
    }

    async fn run_loop(
        options: RelayOptions,
        mut endpoint: RelayEndpoint,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            let connect = tokio::select! {
                result = connect_async(options.url.as_str()) => result,
                _ = shutdown_rx.changed() => break,
            };

            match connect {
                Ok((ws, _)) => {
                    info!(url = %options.url, "Connected to relay");

                    let mut dropped = 0;
                    while endpoint.outbound.try_recv().is_ok() {
                        dropped += 1;
                    }
                    if dropped > 0 {
                        debug!(dropped, "Discarded messages queued while disconnected");
                    }

                    if endpoint.inbound.send(RelayEvent::Connected).is_err() {
                        break;
                    }

                    let closed = tokio::select! {
                        result = Self::pump(ws, &mut endpoint) => result,
                        _ = shutdown_rx.changed() => break,
                    };
                    match closed {
                        Ok(()) => info!("Relay closed the connection"),
                        Err(e) => warn!("Relay link error: {}", e),
                    }

                    if endpoint.inbound.send(RelayEvent::Disconnected).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let err = TransportError::ConnectFailed(e.to_string());
                    warn!("{}", err);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(options.reconnect_interval) => {}
                _ = shutdown_rx.changed() => break,
            }
        }
    }

    /// Shuttle frames until either side closes.
    async fn pump(ws: WsStream, endpoint: &mut RelayEndpoint) -> Result<()> {
        let (mut ws_tx, mut ws_rx) = ws.split();

        loop {
            tokio::select! {
                outgoing = endpoint.outbound.recv() => {
                    let Some(message) = outgoing else {
                        let _ = ws_tx.close().await;
                        return Ok(());
                    };
                    let text = message.encode()?;
                    ws_tx
                        .send(WsMessage::Text(text.into()))
                        .await
                        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
                }

                incoming = ws_rx.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => match Message::decode(&text) {
                            Ok(message) => {
                                if endpoint.inbound.send(RelayEvent::Message(message)).is_err() {
                                    return Ok(());
                                }
                            }
                            Err(e) => warn!("Dropping relay frame: {}", e),
                        },
                        Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(TransportError::ReceiveFailed(e.to_string()).into());
                        }
                    }
                }
            }
        }
    }
}
