//! REST access plane
//!
//! Tenant bookkeeping and grant issuance. Everything here is
//! server-to-server: tenants call with their app credentials, browsers
//! never touch these routes.

pub mod apps;
pub mod auth;
pub mod error;
pub mod rooms;

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;

pub use error::ApiError;

use crate::state::AppState;

/// Build the access-plane router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/apps", post(apps::create_app).get(apps::list_apps))
        .route("/rooms", post(rooms::create_room).get(rooms::list_rooms))
        .route("/rooms/{room_id}", get(rooms::get_room))
        .route("/rooms/{room_id}/token", post(rooms::issue_token))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
}

/// Per-IP rate limiting for every access-plane route.
///
/// Requests without connect-info (only possible when the router is
/// exercised directly in tests) pass through.
async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    if let Some(ip) = ip {
        let allowed = state.limiter.lock().expect("limiter poisoned").check(ip);
        if !allowed {
            return ApiError::RateLimited.into_response();
        }
    }
    next.run(request).await
}

/// Decode a JSON request body into `T`, mapping failures to the
/// canonical validation envelope instead of axum's default rejection.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(format!("invalid body: {}", e)))
}
