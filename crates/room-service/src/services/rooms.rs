//! Room lifecycle manager and participant tracker.
//!
//! The state machine deciding whether a room exists, who may act on it, how
//! guest rooms differ from authenticated rooms, and how expiration is
//! enforced on the read path. Expiration is dual-path: the lazy check here
//! guarantees correctness-on-read, while the background sweeper provides
//! eventual cleanup independent of traffic.

use crate::errors::ServiceError;
use crate::models::{Room, RoomParticipant, RoomStats};
use crate::repositories::{ParticipantsRepository, RoomsRepository};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

/// Guest room allocation window in minutes.
pub const GUEST_ROOM_MINUTES: i32 = 30;

/// Minimum accepted extension in minutes.
pub const MIN_EXTENSION_MINUTES: i64 = 1;

/// Maximum accepted extension in minutes.
pub const MAX_EXTENSION_MINUTES: i64 = 60;

/// Room lifecycle manager.
///
/// Owns its store handle; construct one per process (or per test) and share
/// by cloning. All coordination happens through the store's row-level
/// guarded updates, never through in-process mutable state.
#[derive(Clone)]
pub struct RoomService {
    pool: PgPool,
}

impl RoomService {
    /// Create a service backed by the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a room.
    ///
    /// Without a caller id the room is a guest room, time-boxed to
    /// [`GUEST_ROOM_MINUTES`]; with one it is an authenticated room with no
    /// limit. An active room holding the name blocks creation unless it has
    /// expired, in which case it is lazily retired first.
    ///
    /// # Errors
    ///
    /// - `Conflict` if an active, non-expired room with the name exists
    ///   (including when a concurrent creation wins the race)
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_name = %name, authenticated = caller_user_id.is_some()))]
    pub async fn create_room(
        &self,
        name: &str,
        caller_user_id: Option<&str>,
    ) -> Result<Room, ServiceError> {
        if let Some(existing) = RoomsRepository::find_active_by_name(&self.pool, name).await? {
            if existing.is_expired() {
                // Lazy retirement, roster included; creation then proceeds
                // as if the name were free.
                RoomsRepository::deactivate_with_participants(&self.pool, existing.id).await?;
                info!(
                    target: "meet.services.rooms",
                    room_id = %existing.id,
                    room_name = %name,
                    "Retired expired room during creation"
                );
            } else {
                return Err(ServiceError::Conflict(format!(
                    "room '{name}' already exists and is active"
                )));
            }
        }

        let (expires_at, max_duration_minutes) = match caller_user_id {
            // Guest room with a bounded allocation
            None => (
                Some(Utc::now() + Duration::minutes(i64::from(GUEST_ROOM_MINUTES))),
                Some(GUEST_ROOM_MINUTES),
            ),
            // Authenticated room without limit
            Some(_) => (None, None),
        };

        let room = RoomsRepository::insert(
            &self.pool,
            name,
            caller_user_id,
            expires_at,
            max_duration_minutes,
        )
        .await?;

        info!(
            target: "meet.services.rooms",
            room_id = %room.id,
            room_name = %room.name,
            guest_room = room.is_guest_room(),
            "Room created"
        );

        Ok(room)
    }

    /// Look up an active room by name, applying the lazy expiration check.
    ///
    /// An expired room is retired as a side effect and reported exactly like
    /// an absent one; callers cannot distinguish "never existed" from "just
    /// expired".
    ///
    /// # Errors
    ///
    /// - `NotFound` if no active room holds the name, or it has expired
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_name = %name))]
    pub async fn get_room(&self, name: &str) -> Result<Room, ServiceError> {
        let room = RoomsRepository::find_active_by_name(&self.pool, name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("room '{name}' not found")))?;

        if room.is_expired() {
            RoomsRepository::deactivate_with_participants(&self.pool, room.id).await?;
            info!(
                target: "meet.services.rooms",
                room_id = %room.id,
                room_name = %name,
                "Retired expired room on read"
            );
            return Err(ServiceError::NotFound(format!("room '{name}' not found")));
        }

        Ok(room)
    }

    /// Look up an active room by id.
    ///
    /// Does not re-check expiration; used for immediate post-write reads
    /// where expiry cannot yet apply.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the room is missing or inactive
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_id = %id))]
    pub async fn get_room_by_id(&self, id: Uuid) -> Result<Room, ServiceError> {
        RoomsRepository::find_active_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("room not found".to_string()))
    }

    /// Push a time-boxed room's deadline forward.
    ///
    /// Additive to the current deadline, not to "now": a room near expiry
    /// only moves its existing deadline, it does not reset to a fresh
    /// window.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if `additional_minutes` is outside [1, 60] or
    ///   the room has no deadline (authenticated rooms cannot be extended)
    /// - `NotFound` if the room is missing or inactive
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_id = %id, additional_minutes = additional_minutes))]
    pub async fn extend_room(
        &self,
        id: Uuid,
        additional_minutes: i64,
    ) -> Result<chrono::DateTime<Utc>, ServiceError> {
        if !(MIN_EXTENSION_MINUTES..=MAX_EXTENSION_MINUTES).contains(&additional_minutes) {
            return Err(ServiceError::InvalidOperation(format!(
                "extension must be between {MIN_EXTENSION_MINUTES} and {MAX_EXTENSION_MINUTES} minutes"
            )));
        }

        let room = self.get_room_by_id(id).await?;

        if room.expires_at.is_none() {
            return Err(ServiceError::InvalidOperation(
                "cannot extend a room without an expiration".to_string(),
            ));
        }

        #[allow(clippy::cast_possible_truncation)]
        let minutes = additional_minutes as i32;

        let new_deadline = RoomsRepository::extend_expiry(&self.pool, id, minutes)
            .await?
            // Guard no longer matches: the room was retired between the read
            // and the update.
            .ok_or_else(|| ServiceError::NotFound("room not found".to_string()))?;

        info!(
            target: "meet.services.rooms",
            room_id = %id,
            new_deadline = %new_deadline,
            "Room extended"
        );

        Ok(new_deadline)
    }

    /// Deactivate a room and mark every joined participant as left.
    ///
    /// Unconditional and idempotent; repeated calls succeed with no
    /// additional effect.
    ///
    /// # Errors
    ///
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_id = %id))]
    pub async fn deactivate_room(&self, id: Uuid) -> Result<(), ServiceError> {
        RoomsRepository::deactivate_with_participants(&self.pool, id).await?;

        info!(target: "meet.services.rooms", room_id = %id, "Room deactivated");

        Ok(())
    }

    /// Build a statistics snapshot for a room.
    ///
    /// Reports retired rooms too; `is_expired` is computed on read and not
    /// re-persisted by this path.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no row with the id exists
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_id = %id))]
    pub async fn room_stats(&self, id: Uuid) -> Result<RoomStats, ServiceError> {
        let room = RoomsRepository::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("room not found".to_string()))?;

        let active = ParticipantsRepository::count_active(&self.pool, id).await?;
        let total = ParticipantsRepository::count_total(&self.pool, id).await?;

        Ok(RoomStats {
            room_id: room.id,
            room_name: room.name.clone(),
            created_at: room.created_at,
            expires_at: room.expires_at,
            time_remaining: room.time_remaining(),
            is_guest_room: room.is_guest_room(),
            active_participants: active,
            total_participants: total,
            is_active: room.is_active,
            is_expired: room.is_expired(),
        })
    }

    /// Add a participant to a room, idempotently.
    ///
    /// If the identity is already joined, the existing row is returned
    /// unchanged. Room activity/expiration is not validated here; resolve
    /// the room through [`get_room`](Self::get_room) first.
    ///
    /// # Errors
    ///
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_id = %room_id, identity = %identity))]
    pub async fn add_participant(
        &self,
        room_id: Uuid,
        user_id: Option<&str>,
        identity: &str,
        display_name: &str,
        is_guest: bool,
    ) -> Result<RoomParticipant, ServiceError> {
        if let Some(existing) =
            ParticipantsRepository::find_active(&self.pool, room_id, identity).await?
        {
            return Ok(existing);
        }

        match ParticipantsRepository::insert(
            &self.pool,
            room_id,
            user_id,
            identity,
            display_name,
            is_guest,
        )
        .await
        {
            Ok(participant) => Ok(participant),
            // Lost the insert race: another call joined the same identity
            // between our read and write. Return the winner's row.
            Err(ServiceError::Conflict(reason)) => {
                ParticipantsRepository::find_active(&self.pool, room_id, identity)
                    .await?
                    .ok_or(ServiceError::Conflict(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Mark a participant as left.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the identity has no currently-joined row (already
    ///   left, or never joined)
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_id = %room_id, identity = %identity))]
    pub async fn remove_participant(
        &self,
        room_id: Uuid,
        identity: &str,
    ) -> Result<(), ServiceError> {
        let updated = ParticipantsRepository::mark_left(&self.pool, room_id, identity).await?;

        if updated == 0 {
            return Err(ServiceError::NotFound(
                "participant not found in room".to_string(),
            ));
        }

        Ok(())
    }

    /// List currently-joined participants of a room in join order.
    ///
    /// # Errors
    ///
    /// - `Database` on store failure
    #[instrument(skip(self), fields(room_id = %room_id))]
    pub async fn active_participants(
        &self,
        room_id: Uuid,
    ) -> Result<Vec<RoomParticipant>, ServiceError> {
        ParticipantsRepository::list_active(&self.pool, room_id).await
    }
}
