//! Media server administration client.
//!
//! The room service proxies a small set of administrative operations to the
//! media server: listing the live roster, forcibly removing a participant,
//! and starting/stopping composite recordings. Requests authenticate with a
//! short-lived signed admin credential.
//!
//! # Security
//!
//! - Errors are logged server-side with generic messages returned
//! - Timeouts prevent hanging connections

use crate::errors::ServiceError;
use crate::media::grant::sign_admin_token;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{instrument, warn};

/// Request timeout for media server calls in seconds.
const MEDIA_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Validity window of per-call admin credentials in seconds.
const ADMIN_TOKEN_TTL_SECONDS: i64 = 300;

/// A participant as reported by the media server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaParticipant {
    /// Session identity.
    pub identity: String,

    /// Display name.
    pub name: String,
}

/// Recording lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Recording is spinning up.
    Starting,

    /// Recording is in progress.
    Active,

    /// Recording has ended.
    Ended,
}

/// A composite recording as reported by the media server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingInfo {
    /// Recording identifier.
    pub recording_id: String,

    /// Current status.
    pub status: RecordingStatus,
}

/// Envelope for the roster endpoint.
#[derive(Debug, Deserialize)]
struct ParticipantsEnvelope {
    participants: Vec<MediaParticipant>,
}

/// Administrative operations the core needs from the media server.
///
/// The trait seam lets tests run against an in-memory mock while
/// production wires the HTTP client.
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// List the live roster of a room.
    async fn list_participants(&self, room: &str) -> Result<Vec<MediaParticipant>, ServiceError>;

    /// Forcibly remove a participant from the media session.
    async fn remove_participant(&self, room: &str, identity: &str) -> Result<(), ServiceError>;

    /// Start a composite recording of a room.
    async fn start_recording(&self, room: &str) -> Result<RecordingInfo, ServiceError>;

    /// Stop the active composite recording of a room.
    async fn stop_recording(&self, room: &str) -> Result<RecordingInfo, ServiceError>;
}

/// HTTP client for the media server's administration API.
#[derive(Clone)]
pub struct HttpMediaServer {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Media server base URL.
    base_url: String,

    /// API key identifying this backend.
    api_key: String,

    /// API secret used to sign admin credentials.
    api_secret: String,
}

impl HttpMediaServer {
    /// Create a new media server client.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: String, api_key: String, api_secret: String) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(MEDIA_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                tracing::error!(target: "meet.media.client", error = %e, "Failed to build HTTP client");
                ServiceError::Internal
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            api_secret,
        })
    }

    fn admin_token(&self, room: &str) -> Result<String, ServiceError> {
        sign_admin_token(&self.api_key, &self.api_secret, room, ADMIN_TOKEN_TTL_SECONDS)
    }

    /// Map a non-success media server status to a service error.
    fn map_error_status(status: StatusCode, context: &str) -> ServiceError {
        match status {
            StatusCode::NOT_FOUND => ServiceError::NotFound(context.to_string()),
            StatusCode::CONFLICT => ServiceError::Conflict(context.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ServiceError::Forbidden("media server rejected the request".to_string())
            }
            _ => {
                warn!(
                    target: "meet.media.client",
                    status = %status,
                    context = context,
                    "Unexpected media server response"
                );
                ServiceError::ServiceUnavailable("media server is unavailable".to_string())
            }
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        room: &str,
        context: &str,
    ) -> Result<reqwest::Response, ServiceError> {
        let token = self.admin_token(room)?;

        let response = request
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| {
                warn!(target: "meet.media.client", error = %e, "Media server request failed");
                ServiceError::ServiceUnavailable("media server is unavailable".to_string())
            })?;

        if !response.status().is_success() {
            return Err(Self::map_error_status(response.status(), context));
        }

        Ok(response)
    }
}

#[async_trait]
impl MediaServer for HttpMediaServer {
    #[instrument(skip(self), fields(room = %room))]
    async fn list_participants(&self, room: &str) -> Result<Vec<MediaParticipant>, ServiceError> {
        let url = format!("{}/v1/rooms/{}/participants", self.base_url, room);

        let response = self
            .send(self.client.get(&url), room, "room not found")
            .await?;

        let envelope: ParticipantsEnvelope = response.json().await.map_err(|e| {
            warn!(target: "meet.media.client", error = %e, "Invalid media server response body");
            ServiceError::ServiceUnavailable("media server is unavailable".to_string())
        })?;

        Ok(envelope.participants)
    }

    #[instrument(skip(self), fields(room = %room, identity = %identity))]
    async fn remove_participant(&self, room: &str, identity: &str) -> Result<(), ServiceError> {
        let url = format!(
            "{}/v1/rooms/{}/participants/{}",
            self.base_url, room, identity
        );

        self.send(self.client.delete(&url), room, "participant not found")
            .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(room = %room))]
    async fn start_recording(&self, room: &str) -> Result<RecordingInfo, ServiceError> {
        let url = format!("{}/v1/rooms/{}/recording/start", self.base_url, room);

        let response = self
            .send(
                self.client.post(&url),
                room,
                "recording already in progress",
            )
            .await?;

        response.json().await.map_err(|e| {
            warn!(target: "meet.media.client", error = %e, "Invalid media server response body");
            ServiceError::ServiceUnavailable("media server is unavailable".to_string())
        })
    }

    #[instrument(skip(self), fields(room = %room))]
    async fn stop_recording(&self, room: &str) -> Result<RecordingInfo, ServiceError> {
        let url = format!("{}/v1/rooms/{}/recording/stop", self.base_url, room);

        let response = self
            .send(self.client.post(&url), room, "no active recording found")
            .await?;

        response.json().await.map_err(|e| {
            warn!(target: "meet.media.client", error = %e, "Invalid media server response body");
            ServiceError::ServiceUnavailable("media server is unavailable".to_string())
        })
    }
}

/// In-memory media server for tests and local development.
///
/// Tracks rosters and recordings per room with the same conflict semantics
/// as the real server.
#[derive(Default)]
pub struct MockMediaServer {
    participants: Mutex<HashMap<String, Vec<MediaParticipant>>>,
    recordings: Mutex<HashMap<String, RecordingInfo>>,
    next_recording_id: AtomicU64,
}

impl MockMediaServer {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the roster of a room.
    pub fn set_participants(&self, room: &str, participants: Vec<MediaParticipant>) {
        if let Ok(mut map) = self.participants.lock() {
            map.insert(room.to_string(), participants);
        }
    }
}

#[async_trait]
impl MediaServer for MockMediaServer {
    async fn list_participants(&self, room: &str) -> Result<Vec<MediaParticipant>, ServiceError> {
        let map = self.participants.lock().map_err(|_| ServiceError::Internal)?;
        Ok(map.get(room).cloned().unwrap_or_default())
    }

    async fn remove_participant(&self, room: &str, identity: &str) -> Result<(), ServiceError> {
        let mut map = self.participants.lock().map_err(|_| ServiceError::Internal)?;
        let roster = map
            .get_mut(room)
            .ok_or_else(|| ServiceError::NotFound("room not found".to_string()))?;

        let before = roster.len();
        roster.retain(|p| p.identity != identity);

        if roster.len() == before {
            return Err(ServiceError::NotFound("participant not found".to_string()));
        }

        Ok(())
    }

    async fn start_recording(&self, room: &str) -> Result<RecordingInfo, ServiceError> {
        let mut recordings = self.recordings.lock().map_err(|_| ServiceError::Internal)?;

        if let Some(existing) = recordings.get(room) {
            if existing.status != RecordingStatus::Ended {
                return Err(ServiceError::Conflict(
                    "recording already in progress".to_string(),
                ));
            }
        }

        let id = self.next_recording_id.fetch_add(1, Ordering::SeqCst);
        let info = RecordingInfo {
            recording_id: format!("rec-{id}"),
            status: RecordingStatus::Active,
        };
        recordings.insert(room.to_string(), info.clone());

        Ok(info)
    }

    async fn stop_recording(&self, room: &str) -> Result<RecordingInfo, ServiceError> {
        let mut recordings = self.recordings.lock().map_err(|_| ServiceError::Internal)?;

        match recordings.get_mut(room) {
            Some(info) if info.status != RecordingStatus::Ended => {
                info.status = RecordingStatus::Ended;
                Ok(info.clone())
            }
            _ => Err(ServiceError::NotFound(
                "no active recording found".to_string(),
            )),
        }
    }
}
