//! Service layer: business logic orchestration.
//!
//! [`PairingService`] coordinates pairing operations over the
//! [`super::domain::PairingRegistry`] and turns created sessions into the
//! links handed to clients.

pub mod pairing_service;

pub use pairing_service::{PairingLinks, PairingService, PublicEndpoints};
