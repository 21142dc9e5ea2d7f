//! WebSocket signaling plane
//!
//! Runs an axum HTTP server that upgrades connections to WebSocket and
//! hands each socket to a session task. CORS is permissive: admission is
//! controlled by signed grants, not by origin checking.

pub mod session;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use session::Outbound;

use crate::state::AppState;

/// Maximum accepted frame size. Signaling frames are small; a bulky SDP
/// with every candidate inlined stays well under this.
const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Build the signaling router
///
/// Routes:
/// - `GET /ws` - WebSocket upgrade handler
/// - `GET /health` - Health check (200 OK)
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| session::run(socket, state))
}
