//! A socket bound to one role of a pairing session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{Metadata, PeerEvent, Role};

/// Identifier of a single WebSocket connection.
///
/// Wraps a UUID v4 generated when the socket is accepted. Participant
/// removal is keyed on it so a stale socket can never evict another socket
/// bound to the same role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Participant attached to a session role.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Role slot this participant occupies.
    pub role: Role,
    /// Connection owning the slot.
    pub connection_id: ConnectionId,
    /// When the participant registered.
    pub connected_at: DateTime<Utc>,
    /// Opaque role-supplied metadata.
    pub metadata: Metadata,
    outbound: mpsc::Sender<PeerEvent>,
}

impl Participant {
    /// Creates a participant that receives notices on `outbound`.
    #[must_use]
    pub fn new(
        role: Role,
        connection_id: ConnectionId,
        metadata: Metadata,
        outbound: mpsc::Sender<PeerEvent>,
    ) -> Self {
        Self {
            role,
            connection_id,
            connected_at: Utc::now(),
            metadata,
            outbound,
        }
    }

    /// Queues an event for this participant's socket.
    ///
    /// Never blocks. Returns `false` if the queue is full (the socket is not
    /// keeping up) or the socket task has already gone away; the event is
    /// dropped in both cases.
    pub fn notify(&self, event: PeerEvent) -> bool {
        match self.outbound.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    role = %self.role,
                    terminal = event.is_terminal(),
                    "outbound queue full, notice dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
