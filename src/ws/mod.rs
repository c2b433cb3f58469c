//! WebSocket layer: signaling protocol, connection state machine, relay loop.
//!
//! The endpoint (mounted at the configured path, `/ws` by default) binds a
//! socket to one role of one pairing session and relays signaling frames
//! between the two roles.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod state;
