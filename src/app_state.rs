//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::PairingService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pairing service for all session operations.
    pub pairing_service: Arc<PairingService>,

    /// Bound of each WebSocket's outbound notice queue.
    pub outbound_queue_capacity: usize,
}

impl AppState {
    /// Wraps a service into handler state.
    #[must_use]
    pub fn new(pairing_service: PairingService, outbound_queue_capacity: usize) -> Self {
        Self {
            pairing_service: Arc::new(pairing_service),
            outbound_queue_capacity: outbound_queue_capacity.max(1),
        }
    }
}
