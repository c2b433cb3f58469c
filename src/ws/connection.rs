//! WebSocket connection loop and frame handling.
//!
//! [`run_connection`] owns the socket. It multiplexes client frames and
//! registry notices, feeds both to a [`ConnectionHandler`], and writes out
//! whatever the handler replies. The handler holds all protocol logic and
//! never touches the socket, so it can be driven directly in tests.

use std::sync::Arc;

use axum::extract::ws::{CloseCode, CloseFrame, Message, WebSocket, close_code};
use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::messages::{Envelope, RegisterFrame, ServerMessage, SignalFrame};
use super::state::{Action, Binding, ConnectionState, dispatch};
use crate::domain::{ConnectionId, PairingCode, Participant, PeerEvent};
use crate::error::RelayError;
use crate::service::PairingService;

/// Frames to send in response to one input, and whether to close after.
#[derive(Debug, Default, PartialEq)]
pub struct Reply {
    /// Frames to write, in order.
    pub frames: Vec<ServerMessage>,
    /// Close code to send after the frames, if the connection must end.
    pub close: Option<CloseCode>,
}

impl Reply {
    fn send(frame: ServerMessage) -> Self {
        Self {
            frames: vec![frame],
            close: None,
        }
    }

    fn error(err: &RelayError) -> Self {
        Self::send(ServerMessage::from(err))
    }
}

/// Protocol logic for a single connection.
#[derive(Debug)]
pub struct ConnectionHandler {
    id: ConnectionId,
    state: ConnectionState,
    service: Arc<PairingService>,
    /// Handed to the registry on registration. After that the registry holds
    /// the only sender, so the queue closes once the participant is dropped.
    events: Option<mpsc::Sender<PeerEvent>>,
}

impl ConnectionHandler {
    /// Creates a handler whose registry notices are delivered on `events`.
    #[must_use]
    pub fn new(service: Arc<PairingService>, events: mpsc::Sender<PeerEvent>) -> Self {
        Self {
            id: ConnectionId::new(),
            state: ConnectionState::Unregistered,
            service,
            events: Some(events),
        }
    }

    /// This connection's identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Handles one client text frame.
    pub async fn handle_text(&mut self, text: &str) -> Reply {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => return invalid(format!("malformed JSON: {e}")),
        };
        let kind = match Envelope::deserialize(&value) {
            Ok(envelope) => envelope.kind,
            Err(e) => return invalid(format!("unknown message type: {e}")),
        };

        let phase = self.state.phase();
        match dispatch(phase, kind) {
            Action::Register => match parse_body::<RegisterFrame>(value) {
                Ok(frame) => self.register(frame).await,
                Err(reply) => reply,
            },
            Action::Relay => match parse_body::<SignalFrame>(value) {
                Ok(frame) => self.relay(frame).await,
                Err(reply) => reply,
            },
            Action::Heartbeat => Reply::send(ServerMessage::HeartbeatAck {
                timestamp: Utc::now(),
            }),
            Action::Reject => {
                tracing::debug!(connection_id = %self.id, %phase, %kind, "illegal frame");
                invalid(format!("{kind} is not allowed while {phase}"))
            }
        }
    }

    /// Handles a binary frame. The protocol is text-only.
    #[must_use]
    pub fn handle_binary(&self) -> Reply {
        invalid("binary frames are not supported".to_string())
    }

    /// Turns a registry notice into frames.
    pub fn handle_peer_event(&mut self, event: PeerEvent) -> Reply {
        let terminal = event.is_terminal();
        let mut reply = Reply::send(ServerMessage::from(event));
        if terminal {
            self.state = ConnectionState::Closed;
            reply.close = Some(close_code::NORMAL);
        }
        reply
    }

    /// Handles the notice queue closing without a terminal notice.
    ///
    /// The registry dropped this participant (expiry or cancellation) while
    /// its queue was full, so the notice itself was lost. The socket is
    /// closed normally all the same.
    pub fn handle_detached(&mut self) -> Reply {
        tracing::warn!(connection_id = %self.id, "participant dropped with a full queue");
        self.state = ConnectionState::Closed;
        Reply {
            frames: Vec::new(),
            close: Some(close_code::NORMAL),
        }
    }

    /// Releases the role slot, if any. Must run once the socket is gone.
    pub async fn on_close(&mut self) {
        if let Some(binding) = self.state.binding() {
            self.service
                .registry()
                .leave(binding.code, binding.role, self.id)
                .await;
        }
        self.state = ConnectionState::Closed;
    }

    async fn register(&mut self, frame: RegisterFrame) -> Reply {
        let role = frame.role;
        let Some(events) = self.events.take() else {
            return invalid("already registered".to_string());
        };
        let result = match frame.code.parse::<PairingCode>() {
            Ok(code) => {
                let participant = Participant::new(
                    role,
                    self.id,
                    frame.metadata.unwrap_or_default(),
                    events,
                );
                self.service
                    .registry()
                    .register(code, participant)
                    .await
                    .map(|registration| (code, registration))
            }
            Err(_) => Err(RelayError::NotFound(frame.code)),
        };

        match result {
            Ok((code, registration)) => {
                self.state = ConnectionState::Registered(Binding { code, role });
                let mut reply = Reply::send(ServerMessage::Registered {
                    role,
                    code,
                    expires_at: registration.expires_at,
                    peer_connected: registration.peer.is_some(),
                });
                if let Some(peer) = registration.peer {
                    reply.frames.push(ServerMessage::PeerReady {
                        role: peer.role,
                        metadata: peer.metadata,
                    });
                }
                reply
            }
            Err(err) => {
                tracing::info!(connection_id = %self.id, %role, error = %err, "registration rejected");
                let mut reply = Reply::error(&err);
                if err.is_fatal_for_registration() {
                    self.state = ConnectionState::Closed;
                    reply.close = Some(close_code::POLICY);
                }
                reply
            }
        }
    }

    async fn relay(&mut self, frame: SignalFrame) -> Reply {
        let Some(binding) = self.state.binding() else {
            return invalid("not registered".to_string());
        };
        match self
            .service
            .registry()
            .relay(binding.code, binding.role, self.id, frame.kind, frame.payload)
            .await
        {
            Ok(()) => Reply::default(),
            Err(err) => Reply::error(&err),
        }
    }
}

fn parse_body<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, Reply> {
    serde_json::from_value(value).map_err(|e| invalid(format!("malformed body: {e}")))
}

fn invalid(reason: String) -> Reply {
    Reply::error(&RelayError::InvalidMessage(reason))
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads client frames and dispatches them through the state machine.
/// - Forwards registry notices (peer events, relayed signals) to the client.
/// - Releases the role slot when the socket goes away, however it ends.
///
/// At most `queue_capacity` notices wait for this socket; beyond that the
/// registry refuses further signals to it.
pub async fn run_connection(socket: WebSocket, service: Arc<PairingService>, queue_capacity: usize) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (events_tx, mut events_rx) = mpsc::channel(queue_capacity.max(1));
    let mut handler = ConnectionHandler::new(service, events_tx);
    tracing::debug!(connection_id = %handler.id(), "ws connection opened");

    loop {
        let reply = tokio::select! {
            // Incoming frame from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handler.handle_text(text.as_str()).await,
                    Some(Ok(Message::Binary(_))) => handler.handle_binary(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %handler.id(), error = %e, "ws read failed");
                        break;
                    }
                }
            }
            // Notice from the registry
            event = events_rx.recv() => match event {
                Some(event) => handler.handle_peer_event(event),
                None => handler.handle_detached(),
            },
        };

        if send_reply(&mut ws_tx, &reply).await.is_err() {
            break;
        }
        if let Some(code) = reply.close {
            let _ = ws_tx
                .send(Message::Close(Some(CloseFrame {
                    code,
                    reason: "".into(),
                })))
                .await;
            break;
        }
    }

    handler.on_close().await;
    tracing::debug!(connection_id = %handler.id(), "ws connection closed");
}

async fn send_reply(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    reply: &Reply,
) -> Result<(), axum::Error> {
    for frame in &reply.frames {
        let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
        ws_tx.send(Message::text(json)).await?;
    }
    Ok(())
}
