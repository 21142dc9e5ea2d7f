//! Application (tenant) endpoints

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::ApiError;
use crate::api::parse_json;
use crate::state::AppState;

/// Longest accepted display name
const MAX_NAME_LEN: usize = 128;

#[derive(Debug, Deserialize)]
struct CreateAppRequest {
    name: String,
}

/// Creation response: the only place the secret is ever echoed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCreated {
    pub id: String,
    pub name: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// `POST /apps`
pub async fn create_app(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AppCreated>), ApiError> {
    let req: CreateAppRequest = parse_json(&body)?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ApiError::Validation("name too long".to_string()));
    }

    let tenant = state.tenants.create_tenant(name)?;
    info!(app = %tenant.id, "application created");
    Ok((
        StatusCode::CREATED,
        Json(AppCreated {
            id: tenant.id,
            name: tenant.name,
            secret: tenant.secret,
            created_at: tenant.created_at,
        }),
    ))
}

/// `GET /apps`
pub async fn list_apps(
    State(state): State<AppState>,
) -> Result<Json<Vec<AppSummary>>, ApiError> {
    let tenants = state.tenants.list_tenants()?;
    Ok(Json(
        tenants
            .into_iter()
            .map(|t| AppSummary {
                id: t.id,
                name: t.name,
                created_at: t.created_at,
            })
            .collect(),
    ))
}
