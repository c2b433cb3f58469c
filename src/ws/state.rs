//! Per-connection protocol state machine.
//!
//! A connection moves `Unregistered → Registered → Closed`. Which frames
//! are legal in which state is decided by [`dispatch`], a table keyed by
//! `(phase, kind)`; handlers never branch on message shape to decide
//! legality.

use std::fmt;

use super::messages::MessageKind;
use crate::domain::{PairingCode, Role};

/// The (code, role) a registered socket is bound to for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Session code.
    pub code: PairingCode,
    /// Role slot held.
    pub role: Role,
}

/// State of one WebSocket connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for `register`.
    #[default]
    Unregistered,
    /// Bound to a session role.
    Registered(Binding),
    /// Terminal. No further frames are processed.
    Closed,
}

impl ConnectionState {
    /// Data-less view of the state.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Unregistered => Phase::Unregistered,
            Self::Registered(_) => Phase::Registered,
            Self::Closed => Phase::Closed,
        }
    }

    /// Returns the binding if registered.
    #[must_use]
    pub const fn binding(&self) -> Option<Binding> {
        match self {
            Self::Registered(binding) => Some(*binding),
            Self::Unregistered | Self::Closed => None,
        }
    }
}

/// Data-less connection phase, the row key of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No session bound yet.
    Unregistered,
    /// Bound to a session role.
    Registered,
    /// Terminal.
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::Closed => "closed",
        })
    }
}

/// What to do with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Bind to a session role.
    Register,
    /// Forward a signal to the peer.
    Relay,
    /// Answer with `heartbeat_ack`.
    Heartbeat,
    /// Answer with `InvalidMessage`; the connection stays open.
    Reject,
}

/// The `(phase, kind)` legality table.
///
/// | phase \ kind  | register | signal | heartbeat |
/// |---------------|----------|--------|-----------|
/// | Unregistered  | Register | Reject | Heartbeat |
/// | Registered    | Reject   | Relay  | Heartbeat |
/// | Closed        | Reject   | Reject | Reject    |
#[must_use]
pub const fn dispatch(phase: Phase, kind: MessageKind) -> Action {
    match (phase, kind) {
        (Phase::Unregistered, MessageKind::Register) => Action::Register,
        (Phase::Registered, MessageKind::Signal) => Action::Relay,
        (Phase::Unregistered | Phase::Registered, MessageKind::Heartbeat) => Action::Heartbeat,
        (Phase::Unregistered, MessageKind::Signal)
        | (Phase::Registered, MessageKind::Register)
        | (Phase::Closed, _) => Action::Reject,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_protocol() {
        use Action::*;
        use MessageKind as K;
        let cases = [
            (Phase::Unregistered, K::Register, Register),
            (Phase::Unregistered, K::Signal, Reject),
            (Phase::Unregistered, K::Heartbeat, Heartbeat),
            (Phase::Registered, K::Register, Reject),
            (Phase::Registered, K::Signal, Relay),
            (Phase::Registered, K::Heartbeat, Heartbeat),
            (Phase::Closed, K::Register, Reject),
            (Phase::Closed, K::Signal, Reject),
            (Phase::Closed, K::Heartbeat, Reject),
        ];
        for (phase, kind, expected) in cases {
            assert_eq!(dispatch(phase, kind), expected, "{phase} × {kind}");
        }
    }

    #[test]
    fn binding_only_when_registered() {
        let Some(code) = PairingCode::from_number(1) else {
            panic!("valid code");
        };
        let binding = Binding {
            code,
            role: Role::Mobile,
        };
        assert_eq!(ConnectionState::Unregistered.binding(), None);
        assert_eq!(ConnectionState::Registered(binding).binding(), Some(binding));
        assert_eq!(ConnectionState::Closed.binding(), None);
        assert_eq!(ConnectionState::default().phase(), Phase::Unregistered);
    }
}
