//! Room management handlers.
//!
//! Implements the room lifecycle endpoints:
//!
//! - `POST /api/public/rooms` - Create room (guest or authenticated)
//! - `GET /api/public/rooms/{name}` - Room info + stats snapshot
//! - `POST /api/public/rooms/{name}/join` - Join room
//! - `POST /api/public/rooms/{name}/leave/{identity}` - Leave room
//! - `GET /api/public/rooms/{name}/participants` - Active participants
//! - `POST /api/rooms/{name}/extend` - Extend guest room (authenticated)
//! - `DELETE /api/rooms/{name}` - Deactivate room (owner or admin)
//! - `GET /api/rooms/{name}/stats` - Statistics (authenticated)
//!
//! Creation and join run behind the optional-auth middleware: a missing
//! token means guest, a valid token changes the room kind or the
//! participant's user binding.

use crate::errors::ServiceError;
use crate::models::{
    CreateRoomRequest, ExtendRoomRequest, JoinRoomRequest, JoinRoomResponse, ParticipantsResponse,
    RoomCreatedResponse, RoomExtendedResponse, RoomStats,
};
use crate::routes::AppState;
use crate::services::{is_authorized, AdminAction};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use common::jwt::UserClaims;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Handler for POST /api/public/rooms
///
/// Creates a room. Anonymous callers get a guest room with a 30-minute
/// deadline; authenticated callers get an unlimited room they own.
#[instrument(skip_all, name = "meet.handlers.create_room")]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<UserClaims>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomCreatedResponse>), ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::BadRequest(e.to_string()))?;

    let caller_user_id = claims.as_ref().map(|c| c.sub.as_str());
    let room = state
        .rooms
        .create_room(request.name.trim(), caller_user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(RoomCreatedResponse::from(room))))
}

/// Handler for GET /api/public/rooms/{name}
///
/// Resolves the room through the lazy-expiration check and returns the
/// statistics snapshot.
#[instrument(skip(state), fields(room_name = %name))]
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<RoomStats>, ServiceError> {
    let room = state.rooms.get_room(&name).await?;
    let stats = state.rooms.room_stats(room.id).await?;

    Ok(Json(stats))
}

/// Handler for POST /api/public/rooms/{name}/join
///
/// Adds a participant to an active room. Repeated joins under the same
/// identity return the existing entry.
#[instrument(skip(state, claims, request), fields(room_name = %name))]
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<UserClaims>>,
    Path(name): Path<String>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::BadRequest(e.to_string()))?;

    let room = state.rooms.get_room(&name).await?;

    let user_id = claims.as_ref().map(|c| c.sub.as_str());
    let is_guest = user_id.is_none();

    let participant = state
        .rooms
        .add_participant(room.id, user_id, &request.identity, &request.name, is_guest)
        .await?;

    Ok(Json(JoinRoomResponse {
        participant_id: participant.id,
        room_id: room.id,
        identity: participant.identity,
        name: participant.display_name,
        joined_at: participant.joined_at,
        is_guest: participant.is_guest,
        room_expires_at: room.expires_at,
        time_remaining: room.time_remaining(),
    }))
}

/// Handler for POST /api/public/rooms/{name}/leave/{identity}
#[instrument(skip(state), fields(room_name = %name, identity = %identity))]
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    Path((name, identity)): Path<(String, String)>,
) -> Result<StatusCode, ServiceError> {
    let room = state.rooms.get_room(&name).await?;

    state.rooms.remove_participant(room.id, &identity).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/public/rooms/{name}/participants
#[instrument(skip(state), fields(room_name = %name))]
pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ParticipantsResponse>, ServiceError> {
    let room = state.rooms.get_room(&name).await?;

    let participants = state.rooms.active_participants(room.id).await?;
    let count = participants.len();

    Ok(Json(ParticipantsResponse {
        room_id: room.id,
        room_name: room.name,
        participants,
        count,
    }))
}

/// Handler for POST /api/rooms/{name}/extend
///
/// Pushes a guest room's deadline forward by 1-60 minutes. Authenticated
/// rooms have no deadline and cannot be extended.
#[instrument(skip(state, request), fields(room_name = %name))]
pub async fn extend_room(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<ExtendRoomRequest>,
) -> Result<Json<RoomExtendedResponse>, ServiceError> {
    let room = state.rooms.get_room(&name).await?;

    let new_deadline = state
        .rooms
        .extend_room(room.id, request.additional_minutes)
        .await?;

    // Re-read for the refreshed projection
    let updated = state.rooms.get_room_by_id(room.id).await?;

    Ok(Json(RoomExtendedResponse {
        expires_at: new_deadline,
        time_remaining: updated.time_remaining(),
    }))
}

/// Handler for DELETE /api/rooms/{name}
///
/// Deactivates a room and closes its roster. Allowed for the room owner and
/// for callers passing the admin policy.
#[instrument(skip(state, claims), fields(room_name = %name))]
pub async fn deactivate_room(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<UserClaims>,
    Path(name): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let room = state.rooms.get_room(&name).await?;

    let is_owner = room.created_by.as_deref() == Some(claims.sub.as_str());
    if !is_owner && !is_authorized(&claims.groups, AdminAction::DeactivateRoom) {
        warn!(
            target: "meet.handlers.rooms",
            room_id = %room.id,
            "Caller denied room deactivation"
        );
        return Err(ServiceError::Forbidden("Admin access required".to_string()));
    }

    state.rooms.deactivate_room(room.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/rooms/{name}/stats
#[instrument(skip(state), fields(room_name = %name))]
pub async fn room_stats(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<RoomStats>, ServiceError> {
    let room = state.rooms.get_room(&name).await?;
    let stats = state.rooms.room_stats(room.id).await?;

    Ok(Json(stats))
}
