//! Pairing DTOs for create, get, and delete operations.
//!
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Metadata, PairingCode, PairingSnapshot, RoleOccupancy};
use crate::service::PairingLinks;

/// Request body for `POST /pairings`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePairingRequest {
    /// Session lifetime in seconds (30–900). Server default when omitted.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    /// Opaque creator metadata (e.g. identity hints from the upstream
    /// gateway).
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Metadata>,
}

/// Response body for `POST /pairings` (201 Created).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePairingResponse {
    /// Six-digit pairing code.
    #[schema(value_type = String, example = "482913")]
    pub code: PairingCode,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Seconds until expiry.
    pub expires_in: u64,
    /// Inspection URL of the session.
    pub http_url: String,
    /// WebSocket URL both clients register on.
    pub ws_url: String,
    /// `scheme://pair?data=…` URI to render as a QR code.
    pub qr_data: String,
}

impl From<PairingLinks> for CreatePairingResponse {
    fn from(links: PairingLinks) -> Self {
        Self {
            code: links.code,
            expires_at: links.expires_at,
            expires_in: links.expires_in,
            http_url: links.http_url,
            ws_url: links.ws_url,
            qr_data: links.qr_data,
        }
    }
}

/// Role slot occupancy.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RolesDto {
    /// Desktop attached.
    pub desktop: bool,
    /// Mobile attached.
    pub mobile: bool,
}

impl From<RoleOccupancy> for RolesDto {
    fn from(roles: RoleOccupancy) -> Self {
        Self {
            desktop: roles.desktop,
            mobile: roles.mobile,
        }
    }
}

/// Response body for `GET /pairings/{code}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PairingStatusResponse {
    /// Six-digit pairing code.
    #[schema(value_type = String, example = "482913")]
    pub code: PairingCode,
    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,
    /// Which roles are currently attached.
    pub roles: RolesDto,
}

impl From<PairingSnapshot> for PairingStatusResponse {
    fn from(snapshot: PairingSnapshot) -> Self {
        Self {
            code: snapshot.code,
            expires_at: snapshot.expires_at,
            roles: snapshot.roles.into(),
        }
    }
}

/// Response body for `DELETE /pairings/{code}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelPairingResponse {
    /// Always `true`.
    pub success: bool,
}
