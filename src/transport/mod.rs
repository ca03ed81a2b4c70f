//! Persistent Socket.IO channel to the server.
//!
//! The transport owns the websocket and its reconnect loop. Consumers see a
//! stream of [`TransportEvent`]s and push [`NamedEvent`]s through an
//! unbounded sender; dropping that sender shuts the transport down.

pub mod frame;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use url::Url;

use frame::Frame;

/// A named event with its JSON payload, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedEvent {
    pub name: String,
    pub payload: Value,
}

impl NamedEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The Socket.IO namespace handshake completed.
    Connected,
    /// An established session ended; a reconnect is already scheduled.
    Disconnected { reason: String },
    Event(NamedEvent),
}

/// Exponential reconnect delay: `base`, `2 * base`, `4 * base` ... capped at
/// `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base.saturating_mul(1 << shift).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

enum SessionEnd {
    Shutdown,
    Lost { connected: bool, reason: String },
}

pub struct SocketTransport {
    url: Url,
    backoff: Backoff,
}

impl SocketTransport {
    pub fn new(url: Url, backoff: Backoff) -> Self {
        Self { url, backoff }
    }

    /// Starts the connect loop on the runtime.
    pub fn spawn(
        self,
    ) -> (
        mpsc::UnboundedSender<NamedEvent>,
        mpsc::UnboundedReceiver<TransportEvent>,
        JoinHandle<()>,
    ) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(outbound_rx, events_tx));
        (outbound_tx, events_rx, handle)
    }

    async fn run(
        self,
        mut outbound: mpsc::UnboundedReceiver<NamedEvent>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let mut attempt = 0u32;

        loop {
            match self.session(&mut outbound, &events).await {
                SessionEnd::Shutdown => {
                    debug!("transport: shut down");
                    return;
                }
                SessionEnd::Lost { connected, reason } => {
                    if connected {
                        attempt = 0;
                        if events
                            .send(TransportEvent::Disconnected {
                                reason: reason.clone(),
                            })
                            .is_err()
                        {
                            return;
                        }
                    }
                    attempt += 1;
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        "transport: {} ({}), retry {} in {}s",
                        self.url,
                        reason,
                        attempt,
                        delay.as_secs_f32()
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = drain_offline(&mut outbound) => return,
                    }
                }
            }
        }
    }

    async fn session(
        &self,
        outbound: &mut mpsc::UnboundedReceiver<NamedEvent>,
        events: &mpsc::UnboundedSender<TransportEvent>,
    ) -> SessionEnd {
        let (ws_stream, _) = match connect_async(self.url.as_str()).await {
            Ok(pair) => pair,
            Err(e) => {
                return SessionEnd::Lost {
                    connected: false,
                    reason: e.to_string(),
                }
            }
        };
        debug!("transport: websocket open to {}", self.url);

        let (mut write, mut read) = ws_stream.split();
        let mut connected = false;
        let mut ping_window: Option<Duration> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                incoming = read.next() => {
                    let text = match incoming {
                        Some(Ok(WsMessage::Text(text))) => text,
                        Some(Ok(WsMessage::Close(_))) | None => {
                            return SessionEnd::Lost { connected, reason: "closed by server".to_string() };
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            return SessionEnd::Lost { connected, reason: e.to_string() };
                        }
                    };

                    let frame = match Frame::decode(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("transport: dropping frame: {}", e);
                            continue;
                        }
                    };

                    let reply = match frame {
                        Frame::Open(open) => {
                            debug!("transport: engine session {}", open.sid);
                            if open.ping_interval > 0 {
                                let window = Duration::from_millis(open.ping_interval + open.ping_timeout);
                                ping_window = Some(window);
                                deadline = Some(Instant::now() + window);
                            }
                            Some(Frame::Connect)
                        }
                        Frame::Ping => {
                            deadline = ping_window.map(|window| Instant::now() + window);
                            Some(Frame::Pong)
                        }
                        Frame::Connect => {
                            connected = true;
                            info!("transport: connected to {}", self.url);
                            if events.send(TransportEvent::Connected).is_err() {
                                return SessionEnd::Shutdown;
                            }
                            None
                        }
                        Frame::Event(event) => {
                            if events.send(TransportEvent::Event(event)).is_err() {
                                return SessionEnd::Shutdown;
                            }
                            None
                        }
                        Frame::Close | Frame::Disconnect => {
                            return SessionEnd::Lost { connected, reason: "session closed by server".to_string() };
                        }
                        Frame::ConnectError(message) => {
                            return SessionEnd::Lost { connected, reason: message };
                        }
                        Frame::Pong | Frame::Noop => None,
                    };

                    if let Some(reply) = reply {
                        if let Err(e) = write.send(WsMessage::Text(reply.encode())).await {
                            return SessionEnd::Lost { connected, reason: e.to_string() };
                        }
                    }
                }
                command = outbound.recv() => {
                    let Some(event) = command else {
                        let _ = write.send(WsMessage::Text(Frame::Close.encode())).await;
                        let _ = write.close().await;
                        return SessionEnd::Shutdown;
                    };
                    if !connected {
                        debug!("transport: not connected, dropping {}", event.name);
                        continue;
                    }
                    debug!("transport: emit {}", event.name);
                    if let Err(e) = write.send(WsMessage::Text(Frame::Event(event).encode())).await {
                        return SessionEnd::Lost { connected, reason: e.to_string() };
                    }
                }
                _ = sleep_until(deadline) => {
                    return SessionEnd::Lost { connected, reason: "ping timeout".to_string() };
                }
            }
        }
    }
}

pub(crate) async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Discards commands issued while offline; resolves once the sender is gone.
async fn drain_offline(outbound: &mut mpsc::UnboundedReceiver<NamedEvent>) {
    while let Some(event) = outbound.recv().await {
        debug!("transport: offline, dropping {}", event.name);
    }
}
