//! # pairing-relay
//!
//! Pairing-code rendezvous and WebRTC signaling relay for a desktop app and
//! its mobile companion.
//!
//! The desktop asks the relay for a short-lived six-digit code and shows it
//! (or a QR payload carrying it). Both devices then open a WebSocket, bind
//! to the session under their role, and exchange offer/answer/ICE messages
//! through the relay until the peer-to-peer link is up. The relay never
//! interprets signaling payloads.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)          create / inspect / cancel pairings
//!     ├── WS Gateway (ws/)              register, signal, heartbeat
//!     │
//!     ├── PairingService (service/)     URLs and QR payloads
//!     │
//!     ├── PairingRegistry (domain/)     sessions, role slots, routing
//!     │
//!     └── Sweeper (sweeper)             expiry and abandoned-session pruning
//! ```
//!
//! All state is in memory; a restart drops every session.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod sweeper;
pub mod ws;
