//! Rooms repository for database operations.
//!
//! Room name uniqueness is enforced by a partial unique index over active
//! rows (`rooms_active_name_key`), so a create racing a lazy retirement of
//! the same name surfaces as a reported conflict rather than a duplicate
//! active row.

use crate::errors::ServiceError;
use crate::models::Room;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Name of the partial unique index scoping room names to active rows.
const ACTIVE_NAME_CONSTRAINT: &str = "rooms_active_name_key";

/// Shared column list for queries returning room rows.
const ROOM_COLUMNS: &str =
    "id, name, created_by, created_at, expires_at, max_duration_minutes, is_active";

/// Repository for room row operations.
pub struct RoomsRepository;

impl RoomsRepository {
    /// Find the active room with the given name, if any.
    ///
    /// Does not apply the expiration check; that is the lifecycle manager's
    /// concern.
    #[instrument(skip_all, fields(room_name = %name))]
    pub async fn find_active_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<Room>, ServiceError> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE name = $1 AND is_active");

        let room = sqlx::query_as::<_, Room>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await?;

        Ok(room)
    }

    /// Find the active room with the given id, if any.
    #[instrument(skip_all, fields(room_id = %id))]
    pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Room>, ServiceError> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1 AND is_active");

        let room = sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(room)
    }

    /// Find a room by id regardless of lifecycle state.
    ///
    /// Used by the stats snapshot, which also reports retired rooms.
    #[instrument(skip_all, fields(room_id = %id))]
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Room>, ServiceError> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1");

        let room = sqlx::query_as::<_, Room>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(room)
    }

    /// Insert a new active room.
    ///
    /// A unique violation on the active-name index is reported as
    /// `Conflict`: another caller holds the name among active rooms.
    #[instrument(skip_all, fields(room_name = %name))]
    pub async fn insert(
        pool: &PgPool,
        name: &str,
        created_by: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        max_duration_minutes: Option<i32>,
    ) -> Result<Room, ServiceError> {
        let query = format!(
            r#"
            INSERT INTO rooms (name, created_by, expires_at, max_duration_minutes)
            VALUES ($1, $2, $3, $4)
            RETURNING {ROOM_COLUMNS}
            "#
        );

        let room = sqlx::query_as::<_, Room>(&query)
            .bind(name)
            .bind(created_by)
            .bind(expires_at)
            .bind(max_duration_minutes)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db) = e {
                    if db.constraint() == Some(ACTIVE_NAME_CONSTRAINT) {
                        return ServiceError::Conflict(format!(
                            "room '{name}' already exists and is active"
                        ));
                    }
                }
                ServiceError::from(e)
            })?;

        Ok(room)
    }

    /// Deactivate a room and mark its remaining participants as left, as one
    /// transaction.
    ///
    /// The transaction guarantees no reader observes an inactive room with
    /// still-joined participants. Idempotent: repeated calls succeed with no
    /// additional effect.
    #[instrument(skip_all, fields(room_id = %id))]
    pub async fn deactivate_with_participants(pool: &PgPool, id: Uuid) -> Result<(), ServiceError> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE room_participants
            SET left_at = NOW()
            WHERE room_id = $1 AND left_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE rooms SET is_active = FALSE WHERE id = $1 AND is_active")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Push a room's deadline forward by the given number of minutes.
    ///
    /// Additive to the stored deadline, not to the current time. Guarded on
    /// the room being active and time-boxed; returns the new deadline, or
    /// `None` if the guard did not match.
    #[instrument(skip_all, fields(room_id = %id, additional_minutes = additional_minutes))]
    pub async fn extend_expiry(
        pool: &PgPool,
        id: Uuid,
        additional_minutes: i32,
    ) -> Result<Option<DateTime<Utc>>, ServiceError> {
        let new_deadline = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE rooms
            SET expires_at = expires_at + make_interval(mins => $2)
            WHERE id = $1 AND is_active AND expires_at IS NOT NULL
            RETURNING expires_at
            "#,
        )
        .bind(id)
        .bind(additional_minutes)
        .fetch_optional(pool)
        .await?;

        Ok(new_deadline)
    }

    /// Retire every active room past its deadline, marking still-joined
    /// participants of those rooms as left.
    ///
    /// One transaction per sweep; returns (rooms retired, participants
    /// marked left).
    #[instrument(skip_all)]
    pub async fn retire_expired(pool: &PgPool) -> Result<(u64, u64), ServiceError> {
        let mut tx = pool.begin().await?;

        let participants = sqlx::query(
            r#"
            UPDATE room_participants
            SET left_at = NOW()
            WHERE left_at IS NULL AND room_id IN (
                SELECT id FROM rooms
                WHERE is_active AND expires_at IS NOT NULL AND expires_at < NOW()
            )
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let rooms = sqlx::query(
            r#"
            UPDATE rooms
            SET is_active = FALSE
            WHERE is_active AND expires_at IS NOT NULL AND expires_at < NOW()
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if rooms > 0 {
            tracing::info!(
                target: "meet.repository.rooms",
                rooms = rooms,
                participants = participants,
                "Retired expired rooms"
            );
        }

        Ok((rooms, participants))
    }
}
