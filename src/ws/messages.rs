//! WebSocket message types.
//!
//! Every frame is a JSON text frame with a snake_case `type` discriminator
//! and camelCase fields. Client frames are parsed in two steps: the `type`
//! first (to consult the dispatch table), then the body for that type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Metadata, PairingCode, PeerEvent, Role, SignalKind};
use crate::error::RelayError;

/// Kind of a client → server frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Join a session under a role.
    Register,
    /// Relay a signaling message to the peer.
    Signal,
    /// Liveness probe.
    Heartbeat,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Register => "register",
            Self::Signal => "signal",
            Self::Heartbeat => "heartbeat",
        })
    }
}

/// Just the discriminator of a client frame.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Frame kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// Body of a `register` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisterFrame {
    /// Pairing code as typed or scanned by the user.
    pub code: String,
    /// Requested role slot.
    pub role: Role,
    /// Opaque participant metadata, forwarded to the peer in `peer_ready`.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Body of a `signal` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignalFrame {
    /// Signal kind.
    pub kind: SignalKind,
    /// Opaque payload, relayed as-is. Required; an explicit `null` is
    /// relayed as `null`.
    pub payload: serde_json::Value,
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Registration accepted.
    Registered {
        /// Role slot now held.
        role: Role,
        /// Session code.
        code: PairingCode,
        /// Session expiry.
        expires_at: DateTime<Utc>,
        /// Whether the other role is already attached.
        peer_connected: bool,
    },

    /// The other role is attached and ready to negotiate.
    PeerReady {
        /// Role of the peer.
        role: Role,
        /// Peer metadata.
        metadata: Metadata,
    },

    /// Relayed signaling message.
    Signal {
        /// Sender role.
        from: Role,
        /// Signal kind.
        kind: SignalKind,
        /// Unmodified payload.
        payload: serde_json::Value,
    },

    /// The peer disconnected.
    PeerLeft {
        /// Role of the departed peer.
        role: Role,
    },

    /// Reply to `heartbeat`.
    HeartbeatAck {
        /// Server time.
        timestamp: DateTime<Utc>,
    },

    /// Request failed.
    Error {
        /// Stable error code (e.g. `"PeerNotConnected"`).
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The session's TTL passed; the socket is about to close.
    SessionExpired,

    /// The session was cancelled; the socket is about to close.
    Terminated,
}

impl From<&RelayError> for ServerMessage {
    fn from(err: &RelayError) -> Self {
        Self::Error {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<PeerEvent> for ServerMessage {
    fn from(event: PeerEvent) -> Self {
        match event {
            PeerEvent::PeerReady { role, metadata } => Self::PeerReady { role, metadata },
            PeerEvent::Signal {
                from,
                kind,
                payload,
            } => Self::Signal {
                from,
                kind,
                payload,
            },
            PeerEvent::PeerLeft { role } => Self::PeerLeft { role },
            PeerEvent::SessionExpired => Self::SessionExpired,
            PeerEvent::Terminated => Self::Terminated,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn envelope_reads_only_the_type() {
        let Ok(env) = serde_json::from_str::<Envelope>(r#"{"type":"signal","kind":"bogus"}"#)
        else {
            panic!("type alone must parse");
        };
        assert_eq!(env.kind, MessageKind::Signal);
        assert!(serde_json::from_str::<Envelope>(r#"{"type":"subscribe"}"#).is_err());
        assert!(serde_json::from_str::<Envelope>(r#"{"code":"123456"}"#).is_err());
    }

    #[test]
    fn register_frame_metadata_is_optional() {
        let Ok(frame) = serde_json::from_str::<RegisterFrame>(
            r#"{"type":"register","code":"012345","role":"mobile"}"#,
        ) else {
            panic!("valid register");
        };
        assert_eq!(frame.code, "012345");
        assert_eq!(frame.role, Role::Mobile);
        assert!(frame.metadata.is_none());
    }

    #[test]
    fn signal_frame_requires_payload() {
        assert!(serde_json::from_str::<SignalFrame>(r#"{"type":"signal","kind":"control"}"#).is_err());
        let Ok(frame) =
            serde_json::from_str::<SignalFrame>(r#"{"type":"signal","kind":"control","payload":null}"#)
        else {
            panic!("explicit null is a payload");
        };
        assert_eq!(frame.payload, serde_json::Value::Null);
    }

    #[test]
    fn registered_wire_shape() {
        let Some(code) = PairingCode::from_number(12_345) else {
            panic!("valid code");
        };
        let expires_at = DateTime::<Utc>::UNIX_EPOCH;
        let msg = ServerMessage::Registered {
            role: Role::Desktop,
            code,
            expires_at,
            peer_connected: false,
        };
        let Ok(value) = serde_json::to_value(&msg) else {
            panic!("serializable");
        };
        assert_eq!(
            value,
            serde_json::json!({
                "type": "registered",
                "role": "desktop",
                "code": "012345",
                "expiresAt": "1970-01-01T00:00:00Z",
                "peerConnected": false,
            })
        );
    }

    #[test]
    fn unit_notices_carry_only_type() {
        let value = serde_json::to_value(ServerMessage::SessionExpired).ok();
        assert_eq!(value, Some(serde_json::json!({ "type": "session_expired" })));
        let value = serde_json::to_value(ServerMessage::Terminated).ok();
        assert_eq!(value, Some(serde_json::json!({ "type": "terminated" })));
    }

    #[test]
    fn relayed_signal_keeps_payload() {
        let payload = serde_json::json!({ "sdp": "v=0\r\no=- 1 2 IN IP4 0.0.0.0", "extra": [null, 1.5] });
        let msg = ServerMessage::from(PeerEvent::Signal {
            from: Role::Mobile,
            kind: SignalKind::Answer,
            payload: payload.clone(),
        });
        let value = serde_json::to_value(&msg).ok();
        assert_eq!(
            value,
            Some(serde_json::json!({
                "type": "signal",
                "from": "mobile",
                "kind": "answer",
                "payload": payload,
            }))
        );
    }

    #[test]
    fn error_frame_uses_stable_code() {
        let msg = ServerMessage::from(&RelayError::PeerNotConnected);
        let Ok(value) = serde_json::to_value(&msg) else {
            panic!("serializable");
        };
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "PeerNotConnected");
    }
}
