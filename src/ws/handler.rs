//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// Largest accepted client frame. Signaling payloads are SDP blobs and ICE
/// candidates, well under this.
pub const MAX_FRAME_BYTES: usize = 256 * 1024;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let service = Arc::clone(&state.pairing_service);
    let queue_capacity = state.outbound_queue_capacity;

    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| run_connection(socket, service, queue_capacity))
}
