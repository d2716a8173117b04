//! Room participants repository.
//!
//! Participant rows are append-then-close: created on join, closed exactly
//! once by setting `left_at`. A partial unique index over currently-joined
//! rows (`room_participants_active_identity_key`) backs the idempotent-join
//! invariant at the store level.

use crate::errors::ServiceError;
use crate::models::RoomParticipant;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Name of the partial unique index over currently-joined rows.
const ACTIVE_IDENTITY_CONSTRAINT: &str = "room_participants_active_identity_key";

/// Shared column list for queries returning participant rows.
const PARTICIPANT_COLUMNS: &str =
    "id, room_id, user_id, identity, display_name, is_guest, joined_at, left_at";

/// Repository for participant row operations.
pub struct ParticipantsRepository;

impl ParticipantsRepository {
    /// Find the currently-joined participant with the given identity, if any.
    #[instrument(skip_all, fields(room_id = %room_id, identity = %identity))]
    pub async fn find_active(
        pool: &PgPool,
        room_id: Uuid,
        identity: &str,
    ) -> Result<Option<RoomParticipant>, ServiceError> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM room_participants \
             WHERE room_id = $1 AND identity = $2 AND left_at IS NULL"
        );

        let participant = sqlx::query_as::<_, RoomParticipant>(&query)
            .bind(room_id)
            .bind(identity)
            .fetch_optional(pool)
            .await?;

        Ok(participant)
    }

    /// Insert a new joined participant row.
    ///
    /// A unique violation on the active-identity index means the identity is
    /// already joined; callers resolve it by re-reading the winner's row.
    #[instrument(skip_all, fields(room_id = %room_id, identity = %identity))]
    pub async fn insert(
        pool: &PgPool,
        room_id: Uuid,
        user_id: Option<&str>,
        identity: &str,
        display_name: &str,
        is_guest: bool,
    ) -> Result<RoomParticipant, ServiceError> {
        let query = format!(
            r#"
            INSERT INTO room_participants (room_id, user_id, identity, display_name, is_guest)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        );

        let participant = sqlx::query_as::<_, RoomParticipant>(&query)
            .bind(room_id)
            .bind(user_id)
            .bind(identity)
            .bind(display_name)
            .bind(is_guest)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db) = e {
                    if db.constraint() == Some(ACTIVE_IDENTITY_CONSTRAINT) {
                        return ServiceError::Conflict(format!(
                            "participant '{identity}' is already in the room"
                        ));
                    }
                }
                ServiceError::from(e)
            })?;

        Ok(participant)
    }

    /// Mark a currently-joined participant as left.
    ///
    /// Returns the number of rows updated (0 if the identity has already
    /// left or never joined).
    #[instrument(skip_all, fields(room_id = %room_id, identity = %identity))]
    pub async fn mark_left(
        pool: &PgPool,
        room_id: Uuid,
        identity: &str,
    ) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE room_participants
            SET left_at = NOW()
            WHERE room_id = $1 AND identity = $2 AND left_at IS NULL
            "#,
        )
        .bind(room_id)
        .bind(identity)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// List currently-joined participants of a room in join order.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn list_active(
        pool: &PgPool,
        room_id: Uuid,
    ) -> Result<Vec<RoomParticipant>, ServiceError> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM room_participants \
             WHERE room_id = $1 AND left_at IS NULL ORDER BY joined_at"
        );

        let participants = sqlx::query_as::<_, RoomParticipant>(&query)
            .bind(room_id)
            .fetch_all(pool)
            .await?;

        Ok(participants)
    }

    /// Count currently-joined participants of a room.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn count_active(pool: &PgPool, room_id: Uuid) -> Result<i64, ServiceError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM room_participants WHERE room_id = $1 AND left_at IS NULL",
        )
        .bind(room_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Count every participant row ever created for a room, departed rows
    /// included.
    #[instrument(skip_all, fields(room_id = %room_id))]
    pub async fn count_total(pool: &PgPool, room_id: Uuid) -> Result<i64, ServiceError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM room_participants WHERE room_id = $1")
                .bind(room_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
