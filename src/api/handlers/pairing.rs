//! Pairing CRUD handlers: create, inspect, cancel.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CancelPairingResponse, CreatePairingRequest, CreatePairingResponse, PairingStatusResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};

/// `POST /pairings` — Create a pairing session.
///
/// An empty body is accepted and yields a session with the default TTL.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] on a malformed body or TTL, and
/// [`RelayError::CodeSpaceExhausted`] if no free code could be drawn.
#[utoipa::path(
    post,
    path = "/pairings",
    tag = "Pairings",
    summary = "Create a pairing session",
    description = "Allocates a six-digit code valid for `ttlSeconds` and returns the URLs both clients need, including a `qrData` URI for the companion to scan.",
    request_body = CreatePairingRequest,
    responses(
        (status = 201, description = "Session created", body = CreatePairingResponse),
        (status = 400, description = "Invalid body or TTL", body = ErrorResponse),
        (status = 500, description = "Code space exhausted", body = ErrorResponse),
    )
)]
pub async fn create_pairing(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, RelayError> {
    let req = parse_create_request(&body)?;
    let links = state
        .pairing_service
        .create_pairing(req.ttl_seconds, req.metadata.unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(CreatePairingResponse::from(links))))
}

/// `GET /pairings/{code}` — Inspect a pairing session.
///
/// # Errors
///
/// Returns [`RelayError::NotFound`] (404) or [`RelayError::Expired`] (410).
#[utoipa::path(
    get,
    path = "/pairings/{code}",
    tag = "Pairings",
    summary = "Get pairing status",
    description = "Returns the expiry and which roles are currently attached.",
    params(
        ("code" = String, Path, description = "Six-digit pairing code"),
    ),
    responses(
        (status = 200, description = "Session status", body = PairingStatusResponse),
        (status = 404, description = "Unknown code", body = ErrorResponse),
        (status = 410, description = "Code expired", body = ErrorResponse),
    )
)]
pub async fn get_pairing(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let snapshot = state.pairing_service.get_pairing(&code).await?;
    Ok(Json(PairingStatusResponse::from(snapshot)))
}

/// `DELETE /pairings/{code}` — Cancel a pairing session.
///
/// Attached participants receive `terminated` and are disconnected.
///
/// # Errors
///
/// Returns [`RelayError::NotFound`] (404) or [`RelayError::Expired`] (410).
#[utoipa::path(
    delete,
    path = "/pairings/{code}",
    tag = "Pairings",
    summary = "Cancel a pairing session",
    description = "Disconnects any attached participants with a `terminated` notice and removes the session.",
    params(
        ("code" = String, Path, description = "Six-digit pairing code"),
    ),
    responses(
        (status = 200, description = "Session cancelled", body = CancelPairingResponse),
        (status = 404, description = "Unknown code", body = ErrorResponse),
        (status = 410, description = "Code expired", body = ErrorResponse),
    )
)]
pub async fn cancel_pairing(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    state.pairing_service.cancel_pairing(&code).await?;
    Ok(Json(CancelPairingResponse { success: true }))
}

/// Pairing management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pairings", post(create_pairing))
        .route("/pairings/{code}", get(get_pairing).delete(cancel_pairing))
}

fn parse_create_request(body: &[u8]) -> Result<CreatePairingRequest, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreatePairingRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| RelayError::InvalidRequest(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::PairingRegistry;
    use crate::service::{PairingService, PublicEndpoints};

    fn app() -> Router {
        let service = PairingService::new(
            Arc::new(PairingRegistry::new()),
            PublicEndpoints {
                http_base: "http://relay.test".to_string(),
                ws_url: "ws://relay.test/ws".to_string(),
                qr_scheme: "agiworkforce".to_string(),
            },
        );
        routes().with_state(AppState::new(service, 16))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()));
        let Ok(request) = request else {
            panic!("valid request");
        };
        let Ok(response) = app.clone().oneshot(request).await;
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), 64 * 1024).await else {
            panic!("readable body");
        };
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn create_returns_links() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/pairings", r#"{"ttlSeconds":60}"#).await;
        assert_eq!(status, StatusCode::CREATED);
        let code = body["code"].as_str().unwrap_or_default().to_string();
        assert_eq!(code.len(), 6);
        assert_eq!(body["expiresIn"], 60);
        assert_eq!(body["wsUrl"], "ws://relay.test/ws");
        assert_eq!(
            body["httpUrl"],
            serde_json::json!(format!("http://relay.test/pairings/{code}"))
        );
        assert!(
            body["qrData"]
                .as_str()
                .is_some_and(|uri| uri.starts_with("agiworkforce://pair?data="))
        );
    }

    #[tokio::test]
    async fn create_accepts_empty_body() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/pairings", "").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["expiresIn"], 300);
    }

    #[tokio::test]
    async fn create_rejects_bad_ttl_and_json() {
        let app = app();
        let (status, body) = call(&app, Method::POST, "/pairings", r#"{"ttlSeconds":5}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "InvalidRequest");

        let (status, _) = call(&app, Method::POST, "/pairings", r#"{"ttlSeconds":9000}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::POST, "/pairings", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_and_delete_lifecycle() {
        let app = app();
        let (_, created) = call(&app, Method::POST, "/pairings", "{}").await;
        let code = created["code"].as_str().unwrap_or_default().to_string();
        let path = format!("/pairings/{code}");

        let (status, body) = call(&app, Method::GET, &path, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], serde_json::json!(code));
        assert_eq!(body["roles"], serde_json::json!({"desktop": false, "mobile": false}));

        let (status, body) = call(&app, Method::DELETE, &path, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"success": true}));

        let (status, body) = call(&app, Method::GET, &path, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NotFound");

        let (status, _) = call(&app, Method::DELETE, &path, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_code_is_not_found() {
        let app = app();
        let (status, _) = call(&app, Method::GET, "/pairings/abc", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
