//! Notices delivered to a connected participant.
//!
//! The registry never writes to sockets. Every notice for a participant is
//! pushed as a [`PeerEvent`] into that participant's outbound channel and the
//! owning connection task turns it into a wire frame.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Metadata, Role};

/// Kind of a relayed signaling message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// SDP offer.
    Offer,
    /// SDP answer.
    Answer,
    /// ICE candidate.
    Ice,
    /// Free-form application control frame.
    Control,
}

/// Event routed to a single participant through its outbound channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// The other role has just registered.
    PeerReady {
        /// Role of the newly arrived peer.
        role: Role,
        /// Metadata the peer supplied on registration.
        metadata: Metadata,
    },

    /// A signaling message from the peer, passed through unmodified.
    Signal {
        /// Role of the sender.
        from: Role,
        /// Signal kind.
        kind: SignalKind,
        /// Opaque payload.
        payload: serde_json::Value,
    },

    /// The peer's socket closed.
    PeerLeft {
        /// Role of the departed peer.
        role: Role,
    },

    /// The session reached its TTL and was evicted.
    SessionExpired,

    /// The session was cancelled through the control API.
    Terminated,
}

impl PeerEvent {
    /// Returns `true` if the receiving connection must close after
    /// delivering this event.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_teardown_notices_are_terminal() {
        assert!(PeerEvent::SessionExpired.is_terminal());
        assert!(PeerEvent::Terminated.is_terminal());
        assert!(!PeerEvent::PeerLeft { role: Role::Mobile }.is_terminal());
        assert!(
            !PeerEvent::Signal {
                from: Role::Desktop,
                kind: SignalKind::Ice,
                payload: serde_json::Value::Null,
            }
            .is_terminal()
        );
    }

    #[test]
    fn signal_kind_wire_names() {
        let kinds: Result<Vec<SignalKind>, _> =
            serde_json::from_str(r#"["offer","answer","ice","control"]"#);
        assert_eq!(
            kinds.ok(),
            Some(vec![
                SignalKind::Offer,
                SignalKind::Answer,
                SignalKind::Ice,
                SignalKind::Control
            ])
        );
    }
}
