//! Room service models.
//!
//! Database row types for rooms and participants, request/response bodies
//! for the HTTP surface, and the pure expiry/time-remaining projections the
//! lifecycle manager is built on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Maximum room name length.
pub const MAX_ROOM_NAME_LENGTH: usize = 64;

/// Maximum participant identity length.
pub const MAX_IDENTITY_LENGTH: usize = 128;

/// Maximum participant display name length.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

/// A conference room row.
///
/// Guest-created rooms carry an `expires_at` deadline and a mirrored
/// `max_duration_minutes`; rooms created by an authenticated user have
/// neither (no limit). Retirement is a soft delete via `is_active`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Room {
    /// Unique room identifier.
    pub id: Uuid,

    /// Human-chosen name, unique among active rooms.
    pub name: String,

    /// Creator's user id; None for anonymous guest creations.
    pub created_by: Option<String>,

    /// Creation timestamp (immutable).
    pub created_at: DateTime<Utc>,

    /// Expiration deadline; None means the room never expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// Original guest allocation in minutes, informational.
    pub max_duration_minutes: Option<i32>,

    /// Lifecycle flag; false once retired.
    pub is_active: bool,
}

impl Room {
    /// Whether this room was created without an authenticated owner.
    pub fn is_guest_room(&self) -> bool {
        self.created_by.is_none()
    }

    /// Whether the room is past its deadline at the given instant.
    ///
    /// Rooms without a deadline never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// Whether the room is past its deadline right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whole minutes until the deadline at the given instant.
    ///
    /// `None` means unlimited; `Some(0)` means the deadline has passed.
    pub fn time_remaining_at(&self, now: DateTime<Utc>) -> Option<i64> {
        let deadline = self.expires_at?;
        let remaining = deadline - now;
        if remaining <= chrono::Duration::zero() {
            Some(0)
        } else {
            Some(remaining.num_minutes())
        }
    }

    /// Whole minutes until the deadline right now.
    pub fn time_remaining(&self) -> Option<i64> {
        self.time_remaining_at(Utc::now())
    }
}

/// A participant row, created on join and mutated once on leave.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoomParticipant {
    /// Unique participant row identifier.
    pub id: Uuid,

    /// Parent room.
    pub room_id: Uuid,

    /// Authenticated user id; None for guests.
    pub user_id: Option<String>,

    /// Caller-chosen session handle, unique among currently-joined
    /// participants of a room.
    pub identity: String,

    /// Display name shown to other participants.
    pub display_name: String,

    /// Whether the participant joined without authentication.
    pub is_guest: bool,

    /// Join timestamp (immutable).
    pub joined_at: DateTime<Utc>,

    /// Departure timestamp; None while present in the room.
    pub left_at: Option<DateTime<Utc>>,
}

/// Room statistics snapshot.
///
/// A read-only projection; `is_expired` is computed, not re-persisted by
/// this path.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStats {
    /// Room identifier.
    pub room_id: Uuid,

    /// Room name.
    pub room_name: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Expiration deadline, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Whole minutes until expiry; absent for unlimited rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<i64>,

    /// Whether the room was created without an authenticated owner.
    pub is_guest_room: bool,

    /// Participants currently joined.
    pub active_participants: i64,

    /// Participants ever joined, including departed.
    pub total_participants: i64,

    /// Lifecycle flag.
    pub is_active: bool,

    /// Whether the deadline has passed (computed).
    pub is_expired: bool,
}

// ============================================================================
// Request Bodies
// ============================================================================

/// Request to create a room.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRoomRequest {
    /// Desired room name.
    pub name: String,
}

impl CreateRoomRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), &'static str> {
        let name = self.name.trim();

        if name.is_empty() {
            return Err("Room name is required");
        }

        if name.len() > MAX_ROOM_NAME_LENGTH {
            return Err("Room name must be at most 64 characters");
        }

        Ok(())
    }
}

/// Request to join a room.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinRoomRequest {
    /// Caller-chosen session handle.
    pub identity: String,

    /// Display name.
    pub name: String,
}

impl JoinRoomRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.identity.trim().is_empty() {
            return Err("Identity is required");
        }

        if self.identity.len() > MAX_IDENTITY_LENGTH {
            return Err("Identity must be at most 128 characters");
        }

        if self.name.trim().is_empty() {
            return Err("Name is required");
        }

        if self.name.len() > MAX_DISPLAY_NAME_LENGTH {
            return Err("Name must be at most 100 characters");
        }

        Ok(())
    }
}

/// Request to extend a guest room's deadline.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtendRoomRequest {
    /// Minutes to add to the current deadline.
    pub additional_minutes: i64,
}

/// Request for a media join credential.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenRequest {
    /// Session handle; defaults to the caller's user id.
    #[serde(default)]
    pub identity: Option<String>,

    /// Display name; defaults to the caller's name.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether the credential allows publishing media.
    #[serde(default)]
    pub can_publish: bool,

    /// Whether the credential allows subscribing to media.
    #[serde(default)]
    pub can_subscribe: bool,

    /// Whether recording capability is requested. Granted only if the
    /// caller's groups pass the recording policy.
    #[serde(default)]
    pub can_record: bool,
}

// ============================================================================
// Response Bodies
// ============================================================================

/// Response for room creation.
#[derive(Debug, Clone, Serialize)]
pub struct RoomCreatedResponse {
    /// Room identifier.
    pub room_id: Uuid,

    /// Room name.
    pub name: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Expiration deadline, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Original guest allocation in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_minutes: Option<i32>,

    /// Whether the room was created without an authenticated owner.
    pub is_guest_room: bool,

    /// Whole minutes until expiry; absent for unlimited rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<i64>,
}

impl From<Room> for RoomCreatedResponse {
    fn from(room: Room) -> Self {
        let time_remaining = room.time_remaining();
        let is_guest_room = room.is_guest_room();
        Self {
            room_id: room.id,
            name: room.name,
            created_at: room.created_at,
            expires_at: room.expires_at,
            max_duration_minutes: room.max_duration_minutes,
            is_guest_room,
            time_remaining,
        }
    }
}

/// Response for joining a room.
#[derive(Debug, Clone, Serialize)]
pub struct JoinRoomResponse {
    /// Participant row identifier.
    pub participant_id: Uuid,

    /// Room identifier.
    pub room_id: Uuid,

    /// Session handle.
    pub identity: String,

    /// Display name.
    pub name: String,

    /// Join timestamp.
    pub joined_at: DateTime<Utc>,

    /// Whether the participant joined without authentication.
    pub is_guest: bool,

    /// Room deadline, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_expires_at: Option<DateTime<Utc>>,

    /// Whole minutes until room expiry; absent for unlimited rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<i64>,
}

/// Response listing the active participants of a room.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantsResponse {
    /// Room identifier.
    pub room_id: Uuid,

    /// Room name.
    pub room_name: String,

    /// Currently-joined participants in join order.
    pub participants: Vec<RoomParticipant>,

    /// Number of currently-joined participants.
    pub count: usize,
}

/// Response for a successful room extension.
#[derive(Debug, Clone, Serialize)]
pub struct RoomExtendedResponse {
    /// The new deadline.
    pub expires_at: DateTime<Utc>,

    /// Whole minutes until the new deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<i64>,
}

/// Response carrying a signed media join credential.
#[derive(Debug, Clone, Serialize)]
pub struct TokenIssuedResponse {
    /// The signed credential.
    pub token: String,

    /// Media server URL the client should connect to.
    pub server_url: String,

    /// Room the credential is scoped to.
    pub room_name: String,

    /// Participant identity baked into the credential.
    pub identity: String,

    /// Participant display name baked into the credential.
    pub name: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status ("ok" or "unhealthy").
    pub status: String,

    /// Database connectivity status.
    pub database: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn guest_room(expires_in: Option<Duration>) -> Room {
        let now = Utc::now();
        Room {
            id: Uuid::new_v4(),
            name: "standup".to_string(),
            created_by: None,
            created_at: now,
            expires_at: expires_in.map(|d| now + d),
            max_duration_minutes: expires_in.map(|_| 30),
            is_active: true,
        }
    }

    #[test]
    fn test_room_without_deadline_never_expires() {
        let room = guest_room(None);
        let far_future = Utc::now() + Duration::days(365);

        assert!(!room.is_expired_at(far_future));
        assert_eq!(room.time_remaining_at(far_future), None);
    }

    #[test]
    fn test_room_expires_exactly_past_deadline() {
        let room = guest_room(Some(Duration::minutes(30)));
        let deadline = room.expires_at.unwrap();

        // At the deadline the room is not yet expired
        assert!(!room.is_expired_at(deadline));
        // One second past, it is
        assert!(room.is_expired_at(deadline + Duration::seconds(1)));
    }

    #[test]
    fn test_time_remaining_floors_to_whole_minutes() {
        let room = guest_room(Some(Duration::minutes(29) + Duration::seconds(59)));
        let now = room.created_at;

        assert_eq!(room.time_remaining_at(now), Some(29));
    }

    #[test]
    fn test_time_remaining_zero_after_deadline() {
        let room = guest_room(Some(Duration::minutes(30)));
        let past_deadline = room.expires_at.unwrap() + Duration::minutes(5);

        assert_eq!(room.time_remaining_at(past_deadline), Some(0));
    }

    #[test]
    fn test_is_guest_room() {
        let guest = guest_room(Some(Duration::minutes(30)));
        assert!(guest.is_guest_room());

        let mut owned = guest_room(None);
        owned.created_by = Some("u1".to_string());
        assert!(!owned.is_guest_room());
    }

    #[test]
    fn test_create_room_request_validation() {
        let ok = CreateRoomRequest {
            name: "standup".to_string(),
        };
        assert!(ok.validate().is_ok());

        let empty = CreateRoomRequest {
            name: "   ".to_string(),
        };
        assert_eq!(empty.validate().unwrap_err(), "Room name is required");

        let long = CreateRoomRequest {
            name: "a".repeat(MAX_ROOM_NAME_LENGTH + 1),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_create_room_request_rejects_unknown_fields() {
        let json = r#"{"name":"standup","extra":"field"}"#;
        let result: Result<CreateRoomRequest, _> = serde_json::from_str(json);
        assert!(result.is_err(), "Should reject unknown fields");
    }

    #[test]
    fn test_join_room_request_validation() {
        let ok = JoinRoomRequest {
            identity: "alice".to_string(),
            name: "Alice".to_string(),
        };
        assert!(ok.validate().is_ok());

        let no_identity = JoinRoomRequest {
            identity: String::new(),
            name: "Alice".to_string(),
        };
        assert_eq!(no_identity.validate().unwrap_err(), "Identity is required");

        let long_name = JoinRoomRequest {
            identity: "alice".to_string(),
            name: "a".repeat(MAX_DISPLAY_NAME_LENGTH + 1),
        };
        assert!(long_name.validate().is_err());
    }

    #[test]
    fn test_token_request_defaults() {
        let request: TokenRequest = serde_json::from_str("{}").unwrap();

        assert_eq!(request.identity, None);
        assert_eq!(request.name, None);
        assert!(!request.can_publish);
        assert!(!request.can_subscribe);
        assert!(!request.can_record);
    }

    #[test]
    fn test_room_created_response_from_guest_room() {
        let room = guest_room(Some(Duration::minutes(30)));
        let response = RoomCreatedResponse::from(room.clone());

        assert_eq!(response.room_id, room.id);
        assert!(response.is_guest_room);
        assert!(response.expires_at.is_some());
        assert!(response.time_remaining.is_some());
    }

    #[test]
    fn test_room_stats_serialization_omits_absent_deadline() {
        let stats = RoomStats {
            room_id: Uuid::nil(),
            room_name: "team-sync".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            time_remaining: None,
            is_guest_room: false,
            active_participants: 2,
            total_participants: 5,
            is_active: true,
            is_expired: false,
        };

        let json = serde_json::to_string(&stats).expect("serialization should succeed");
        assert!(!json.contains("expires_at"));
        assert!(!json.contains("time_remaining"));
        assert!(json.contains("\"active_participants\":2"));
    }
}
