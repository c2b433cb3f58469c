//! Pairing service: orchestrates the registry and builds public links.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::RelayConfig;
use crate::domain::{Metadata, PairingCode, PairingRegistry, PairingSnapshot, QrPayload};
use crate::error::RelayError;

/// Everything a creator needs to start pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingLinks {
    /// Allocated code.
    pub code: PairingCode,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Seconds until expiry.
    pub expires_in: u64,
    /// Inspection URL of the session.
    pub http_url: String,
    /// Public WebSocket endpoint.
    pub ws_url: String,
    /// Scannable pairing URI.
    pub qr_data: String,
}

/// Public endpoints advertised to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicEndpoints {
    /// Base URL of the HTTP API, without trailing slash.
    pub http_base: String,
    /// WebSocket URL clients register on.
    pub ws_url: String,
    /// URI scheme of the QR payload.
    pub qr_scheme: String,
}

impl From<&RelayConfig> for PublicEndpoints {
    fn from(config: &RelayConfig) -> Self {
        Self {
            http_base: config.public_http_url.clone(),
            ws_url: config.public_ws_url.clone(),
            qr_scheme: config.qr_scheme.clone(),
        }
    }
}

/// Orchestration layer for pairing operations.
///
/// Owns the shared [`PairingRegistry`] and the public endpoint settings.
/// HTTP handlers and WebSocket connections both go through it, so tests can
/// stand up an isolated service per case.
#[derive(Debug, Clone)]
pub struct PairingService {
    registry: Arc<PairingRegistry>,
    endpoints: PublicEndpoints,
}

impl PairingService {
    /// Creates a new `PairingService`.
    #[must_use]
    pub fn new(registry: Arc<PairingRegistry>, endpoints: PublicEndpoints) -> Self {
        Self {
            registry,
            endpoints,
        }
    }

    /// Returns a reference to the inner [`PairingRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<PairingRegistry> {
        &self.registry
    }

    /// Creates a session and returns its public links.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] for an out-of-range TTL and
    /// [`RelayError::CodeSpaceExhausted`] if no free code was found.
    pub async fn create_pairing(
        &self,
        ttl_secs: Option<u64>,
        metadata: Metadata,
    ) -> Result<PairingLinks, RelayError> {
        let ticket = self.registry.create(ttl_secs, metadata).await?;
        let qr = QrPayload::new(ticket.code, self.endpoints.ws_url.clone());
        Ok(PairingLinks {
            code: ticket.code,
            expires_at: ticket.expires_at,
            expires_in: ticket.ttl_secs,
            http_url: format!("{}/pairings/{}", self.endpoints.http_base, ticket.code),
            ws_url: self.endpoints.ws_url.clone(),
            qr_data: qr.to_uri(&self.endpoints.qr_scheme),
        })
    }

    /// Looks up a session.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] or [`RelayError::Expired`].
    pub async fn get_pairing(&self, code: &str) -> Result<PairingSnapshot, RelayError> {
        self.registry.get(code).await
    }

    /// Cancels a session and disconnects its participants.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] or [`RelayError::Expired`].
    pub async fn cancel_pairing(&self, code: &str) -> Result<(), RelayError> {
        self.registry.cancel(code).await.map(|_| ())
    }
}
