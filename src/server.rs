//! Router composition and server lifecycle.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::domain::PairingRegistry;
use crate::service::{PairingService, PublicEndpoints};
use crate::sweeper::spawn_sweeper;
use crate::ws::handler::ws_handler;

/// Builds the shared state for `config`: an empty registry with the
/// configured policy behind a service that knows the public URLs.
#[must_use]
pub fn build_state(config: &RelayConfig) -> AppState {
    let registry = Arc::new(PairingRegistry::with_policy(config.policy));
    AppState::new(
        PairingService::new(registry, PublicEndpoints::from(config)),
        config.outbound_queue_capacity,
    )
}

/// Assembles the HTTP and WebSocket routes with the middleware stack.
pub fn build_app(state: AppState, config: &RelayConfig) -> Router {
    Router::new()
        .merge(api::build_router())
        .route(&config.ws_path, get(ws_handler))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the relay on `listener` until `shutdown` resolves.
///
/// The expiry sweeper runs for as long as the server does.
///
/// # Errors
///
/// Returns the I/O error that stopped the accept loop, if any.
pub async fn serve<F>(listener: TcpListener, config: RelayConfig, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = build_state(&config);
    let sweeper = spawn_sweeper(
        Arc::clone(state.pairing_service.registry()),
        config.sweep_interval(),
    );
    let app = build_app(state, &config);

    tracing::info!(
        addr = %config.listen_addr,
        ws_path = %config.ws_path,
        public_http_url = %config.public_http_url,
        "pairing relay listening"
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.abort();
    tracing::info!("pairing relay stopped");
    result
}
