//! WebSocket transport actor.
//!
//! The actor exclusively owns the socket. Inbound frames are parsed as JSON
//! and forwarded as [`TransportEvent`]s in network arrival order; outbound
//! frames are serialized from a channel in call order. No other component
//! writes to the socket.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value as Json;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::hydra::error::Result;

/// Events emitted by the transport actor, tagged with the connection epoch
/// so events from a torn-down connection can be discarded.
#[derive(Debug, Clone)]
pub struct TransportEvent {
    pub epoch: u64,
    pub kind: TransportEventKind,
}

/// What happened on the socket.
#[derive(Debug, Clone)]
pub enum TransportEventKind {
    /// A JSON frame arrived.
    Frame(Json),
    /// The socket errored; a `Closed` follows.
    Error(String),
    /// The socket closed.
    Closed { code: Option<u16> },
}

/// Outbound instructions accepted by the actor.
#[derive(Debug)]
pub enum OutboundFrame {
    /// Serialized JSON text frame.
    Text(String),
    /// Graceful close with the given code.
    Close { code: u16 },
}

/// Cloneable sender half of the transport actor.
///
/// Held in the machine context as the "connection" and by the provider for
/// outbound traffic; the actor task owns the socket itself.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

impl ConnectionHandle {
    /// Queue a serialized frame for sending.
    ///
    /// Returns false if the actor is gone (socket already closed).
    pub fn send_text(&self, text: String) -> bool {
        self.tx.send(OutboundFrame::Text(text)).is_ok()
    }

    /// Queue a graceful close.
    pub fn close(&self, code: u16) {
        let _ = self.tx.send(OutboundFrame::Close { code });
    }

    /// A handle wired to a plain channel instead of a socket.
    ///
    /// Useful for tests and custom transports: frames sent through the
    /// handle appear on the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle { tx }, rx)
    }
}

/// Open a WebSocket to `url` and spawn the actor task.
///
/// Transport events are delivered to `events` tagged with `epoch`; the
/// returned handle feeds the outbound side.
pub async fn connect(
    url: &str,
    epoch: u64,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> Result<ConnectionHandle> {
    let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    tokio::spawn(run(ws, epoch, outbound_rx, events));

    Ok(ConnectionHandle { tx: outbound_tx })
}

async fn run(
    ws: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    epoch: u64,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut sink, mut stream) = ws.split();
    let emit = |kind: TransportEventKind| {
        let _ = events.send(TransportEvent { epoch, kind });
    };

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(OutboundFrame::Text(text)) => {
                        tracing::trace!(epoch, %text, "sending frame");
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            emit(TransportEventKind::Error(e.to_string()));
                        }
                    }
                    Some(OutboundFrame::Close { code }) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "Client disconnected".into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        // The server's close reply (or stream end) finishes
                        // the read side below.
                    }
                    // All handles dropped: tear the socket down.
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                }
            }

            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<Json>(&text) {
                            Ok(json) => emit(TransportEventKind::Frame(json)),
                            Err(e) => {
                                tracing::warn!(epoch, error = %e, "dropping non-JSON frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.map(|f| u16::from(f.code));
                        emit(TransportEventKind::Closed { code });
                        break;
                    }
                    // Ping/pong and binary frames carry no protocol traffic.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        emit(TransportEventKind::Error(e.to_string()));
                        emit(TransportEventKind::Closed { code: None });
                        break;
                    }
                    None => {
                        emit(TransportEventKind::Closed { code: None });
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!(epoch, "transport actor stopped");
}
