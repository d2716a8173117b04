//! Media server handlers.
//!
//! Implements join-credential issuance and the administrative proxy
//! operations gated by the authorization policy:
//!
//! - `POST /api/rooms/{name}/token` - Issue a join credential
//! - `GET /api/rooms/{name}/participants` - Live media roster
//! - `DELETE /api/rooms/{name}/participants/{identity}` - Forced removal
//! - `POST /api/rooms/{name}/recording/start` - Start composite recording
//! - `POST /api/rooms/{name}/recording/stop` - Stop composite recording

use crate::errors::ServiceError;
use crate::media::{MediaParticipant, RecordingInfo, VideoGrant};
use crate::models::{TokenIssuedResponse, TokenRequest};
use crate::routes::AppState;
use crate::services::{is_authorized, AdminAction};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use common::jwt::UserClaims;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Response listing the media server's live roster.
#[derive(Debug, Serialize)]
pub struct MediaRosterResponse {
    /// Participants currently connected to the media session.
    pub participants: Vec<MediaParticipant>,

    /// Number of connected participants.
    pub count: usize,
}

/// Handler for POST /api/rooms/{name}/token
///
/// Issues a signed join credential for the caller. Identity and display
/// name default to the caller's claims. Recording capability is granted
/// only when requested and permitted by the policy; otherwise the request
/// is honored without it.
#[instrument(skip(state, claims, request), fields(room_name = %name))]
pub async fn generate_token(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<UserClaims>,
    Path(name): Path<String>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenIssuedResponse>, ServiceError> {
    // Resolve through the lazy-expiration check; no credentials for rooms
    // that are gone.
    let room = state.rooms.get_room(&name).await?;

    let identity = request
        .identity
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| claims.sub.clone());

    let participant_name = request
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| claims.name.clone());

    let mut grant = VideoGrant {
        room_join: true,
        room: room.name.clone(),
        can_publish: request.can_publish,
        can_subscribe: request.can_subscribe,
        ..VideoGrant::default()
    };

    if request.can_record && is_authorized(&claims.groups, AdminAction::StartRecording) {
        grant.can_publish_data = Some(true);
    }

    let metadata = serde_json::json!({
        "user_id": claims.sub,
        "email": claims.email,
    })
    .to_string();

    let token = crate::media::sign_join_token(
        &state.config.media_api_key,
        &state.config.media_api_secret,
        &identity,
        &participant_name,
        grant,
        metadata,
    )?;

    info!(
        target: "meet.handlers.media",
        room_name = %room.name,
        "Issued join credential"
    );

    Ok(Json(TokenIssuedResponse {
        token,
        server_url: state.config.media_server_url.clone(),
        room_name: room.name,
        identity,
        name: participant_name,
    }))
}

/// Handler for GET /api/rooms/{name}/participants
///
/// Returns the media server's view of the room roster.
#[instrument(skip(state), fields(room_name = %name))]
pub async fn media_participants(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<MediaRosterResponse>, ServiceError> {
    let participants = state.media.list_participants(&name).await?;
    let count = participants.len();

    Ok(Json(MediaRosterResponse {
        participants,
        count,
    }))
}

/// Handler for DELETE /api/rooms/{name}/participants/{identity}
///
/// Forcibly removes a participant from the media session. Requires the
/// admin policy.
#[instrument(skip(state, claims), fields(room_name = %name, identity = %identity))]
pub async fn remove_media_participant(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<UserClaims>,
    Path((name, identity)): Path<(String, String)>,
) -> Result<StatusCode, ServiceError> {
    if !is_authorized(&claims.groups, AdminAction::RemoveParticipant) {
        warn!(
            target: "meet.handlers.media",
            room_name = %name,
            "Caller denied forced participant removal"
        );
        return Err(ServiceError::Forbidden("Admin access required".to_string()));
    }

    state.media.remove_participant(&name, &identity).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/rooms/{name}/recording/start
///
/// Starts a composite recording. Requires the recording policy; conflicts
/// if a recording is already in progress.
#[instrument(skip(state, claims), fields(room_name = %name))]
pub async fn start_recording(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<UserClaims>,
    Path(name): Path<String>,
) -> Result<Json<RecordingInfo>, ServiceError> {
    if !is_authorized(&claims.groups, AdminAction::StartRecording) {
        warn!(
            target: "meet.handlers.media",
            room_name = %name,
            "Caller denied recording start"
        );
        return Err(ServiceError::Forbidden(
            "Recording access required".to_string(),
        ));
    }

    let info = state.media.start_recording(&name).await?;

    info!(
        target: "meet.handlers.media",
        room_name = %name,
        recording_id = %info.recording_id,
        "Recording started"
    );

    Ok(Json(info))
}

/// Handler for POST /api/rooms/{name}/recording/stop
///
/// Stops the active composite recording. Requires the recording policy.
#[instrument(skip(state, claims), fields(room_name = %name))]
pub async fn stop_recording(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<UserClaims>,
    Path(name): Path<String>,
) -> Result<Json<RecordingInfo>, ServiceError> {
    if !is_authorized(&claims.groups, AdminAction::StopRecording) {
        warn!(
            target: "meet.handlers.media",
            room_name = %name,
            "Caller denied recording stop"
        );
        return Err(ServiceError::Forbidden(
            "Recording access required".to_string(),
        ));
    }

    let info = state.media.stop_recording(&name).await?;

    info!(
        target: "meet.handlers.media",
        room_name = %name,
        recording_id = %info.recording_id,
        "Recording stopped"
    );

    Ok(Json(info))
}
