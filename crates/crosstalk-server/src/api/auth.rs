//! Tenant authentication for the access plane
//!
//! Server-to-server calls carry the tenant id and its bearer secret in
//! headers; the store compares the secret in constant time.

use axum::http::HeaderMap;
use crosstalk_store::Tenant;

use crate::api::error::ApiError;
use crate::state::AppState;

pub const APP_ID_HEADER: &str = "x-app-id";
pub const APP_SECRET_HEADER: &str = "x-app-secret";

/// Resolve the calling tenant or fail `UNAUTHORIZED`.
///
/// An unknown app id and a wrong secret are deliberately the same error.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Tenant, ApiError> {
    let app_id = header_value(headers, APP_ID_HEADER)?;
    let secret = header_value(headers, APP_SECRET_HEADER)?;
    state
        .tenants
        .verify_secret(app_id, secret)
        .map_err(|_| ApiError::Unauthorized("invalid application credentials".to_string()))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", name)))
}
