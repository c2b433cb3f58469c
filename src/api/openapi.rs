//! Generated OpenAPI document for the control API.

use utoipa::OpenApi;

use super::dto::{
    CancelPairingResponse, CreatePairingRequest, CreatePairingResponse, PairingStatusResponse,
    RolesDto,
};
use super::handlers::{pairing, system};
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "pairing-relay",
        description = "Pairing-code rendezvous and WebRTC signaling relay. The WebSocket protocol is served on the configured `WS_PATH` and is not described here."
    ),
    paths(
        pairing::create_pairing,
        pairing::get_pairing,
        pairing::cancel_pairing,
        system::health_handler,
    ),
    components(schemas(
        CreatePairingRequest,
        CreatePairingResponse,
        PairingStatusResponse,
        RolesDto,
        CancelPairingResponse,
        system::HealthResponse,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Pairings", description = "Pairing session lifecycle"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_pairing_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/pairings"));
        assert!(paths.iter().any(|p| p.as_str() == "/pairings/{code}"));
        assert!(paths.iter().any(|p| p.as_str() == "/health"));
    }
}
