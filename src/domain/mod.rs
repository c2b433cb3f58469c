//! Domain layer: pairing codes, sessions, the registry, and peer notices.
//!
//! Everything that touches session state lives here. The registry is the
//! single owner of that state; the HTTP and WebSocket layers only call into
//! it.

pub mod pairing_code;
pub mod pairing_registry;
pub mod pairing_session;
pub mod participant;
pub mod peer_event;
pub mod qr_payload;
pub mod role;

pub use pairing_code::PairingCode;
pub use pairing_registry::{PairingRegistry, RegistryPolicy};
pub use pairing_session::{PairingSession, PairingSnapshot, RoleOccupancy};
pub use participant::{ConnectionId, Participant};
pub use peer_event::{PeerEvent, SignalKind};
pub use qr_payload::QrPayload;
pub use role::Role;

/// Opaque key/value blob attached by creators and participants. Never
/// interpreted by the relay.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
