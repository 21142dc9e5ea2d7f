//! Room and token endpoints
//!
//! All routes here are tenant-scoped: the caller authenticates with its
//! app credentials and only ever sees its own rooms. Token issuance is
//! the access plane's whole purpose; everything else is bookkeeping
//! around it.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use crosstalk_grant::{parse_ttl, MAX_USER_ID_LEN};
use crosstalk_protocol::Role;
use crosstalk_store::RoomRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::auth::authenticate;
use crate::api::error::ApiError;
use crate::api::parse_json;
use crate::state::AppState;

/// Seats per room unless the tenant asks otherwise
const DEFAULT_MAX_PARTICIPANTS: u32 = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    name: String,
    max_participants: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub id: String,
    pub app_id: String,
    pub name: String,
    pub max_participants: u32,
    pub created_at: DateTime<Utc>,
}

impl From<RoomRecord> for RoomResponse {
    fn from(room: RoomRecord) -> Self {
        Self {
            id: room.id,
            app_id: room.app_id,
            name: room.name,
            max_participants: room.max_participants,
            created_at: room.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueTokenRequest {
    user_id: String,
    role: Role,
    expires_in: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// `POST /rooms`
pub async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let tenant = authenticate(&state, &headers)?;
    let req: CreateRoomRequest = parse_json(&body)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    let max_participants = req.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS);
    if max_participants == 0 {
        return Err(ApiError::Validation(
            "maxParticipants must be at least 1".to_string(),
        ));
    }

    let room = state.rooms.create_room(&tenant.id, name, max_participants)?;
    info!(app = %tenant.id, room = %room.id, "room created");
    Ok((StatusCode::CREATED, Json(room.into())))
}

/// `GET /rooms`
pub async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RoomResponse>>, ApiError> {
    let tenant = authenticate(&state, &headers)?;
    let rooms = state.rooms.list_rooms(&tenant.id)?;
    Ok(Json(rooms.into_iter().map(RoomResponse::from).collect()))
}

/// `GET /rooms/{room_id}`
pub async fn get_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let tenant = authenticate(&state, &headers)?;
    let room = owned_room(&state, &tenant.id, &room_id)?;
    Ok(Json(room.into()))
}

/// `POST /rooms/{room_id}/token`
pub async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let tenant = authenticate(&state, &headers)?;
    let room = owned_room(&state, &tenant.id, &room_id)?;
    let req: IssueTokenRequest = parse_json(&body)?;

    if req.user_id.is_empty() {
        return Err(ApiError::Validation("userId must not be empty".to_string()));
    }
    if req.user_id.len() > MAX_USER_ID_LEN {
        return Err(ApiError::Validation("userId too long".to_string()));
    }

    let ttl = match req.expires_in.as_deref() {
        Some(spec) => parse_ttl(spec)?,
        None => state.default_ttl,
    };

    let issued = state
        .signer
        .issue(&tenant.id, &room.id, &req.user_id, req.role, ttl)?;
    let expires_at = DateTime::from_timestamp(issued.claims.exp, 0)
        .ok_or_else(|| ApiError::internal("expiry out of range"))?;

    info!(
        app = %tenant.id,
        room = %room.id,
        user = %req.user_id,
        grant = %issued.claims.jti,
        "grant issued"
    );
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            token: issued.token,
            expires_at,
        }),
    ))
}

/// Fetch a room and insist the caller owns it.
///
/// Existence is 404, foreign ownership is 403; a tenant probing another
/// tenant's room id learns it exists, which is acceptable because room
/// ids are unguessable.
fn owned_room(state: &AppState, tenant_id: &str, room_id: &str) -> Result<RoomRecord, ApiError> {
    let room = state
        .rooms
        .get_room(room_id)
        .map_err(|_| ApiError::NotFound("no such room".to_string()))?;
    if room.app_id != tenant_id {
        return Err(ApiError::Forbidden(
            "room belongs to another application".to_string(),
        ));
    }
    Ok(room)
}
