//! Room expiration sweeper.
//!
//! Periodically retires rooms past their deadline and marks their remaining
//! participants as left. The sweep is the eventual-cleanup half of the
//! dual-path expiration design; the lazy check in the lifecycle manager's
//! read path keeps expired rooms unobservable even when a sweep is behind.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When the
//! token is cancelled, the task completes its current iteration and exits
//! cleanly.

use crate::repositories::RoomsRepository;
use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Default sweep interval in seconds (5 minutes).
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;

/// Configuration for the room sweeper task.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Sweep interval in seconds.
    pub sweep_interval_seconds: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

impl SweeperConfig {
    /// Create config from environment variables.
    ///
    /// Environment variables:
    /// - `MEET_SWEEP_INTERVAL_SECONDS` - Sweep interval (default: 300)
    pub fn from_env() -> Self {
        let sweep_interval_seconds = std::env::var("MEET_SWEEP_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECONDS);

        Self {
            sweep_interval_seconds,
        }
    }
}

/// Start the room sweeper background task.
///
/// Runs in a loop, sweeping at the configured interval, independent of
/// request traffic. Each tick is independent and idempotent: a failed tick
/// is logged and the next proceeds; a missed tick only delays retirement.
///
/// Returns when the cancellation token is triggered.
#[instrument(skip_all, name = "meet.task.room_sweeper")]
pub async fn start_room_sweeper(pool: PgPool, config: SweeperConfig, cancel_token: CancellationToken) {
    info!(
        target: "meet.task.room_sweeper",
        sweep_interval_seconds = config.sweep_interval_seconds,
        "Starting room sweeper task"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_seconds));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_sweep(&pool).await;
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "meet.task.room_sweeper",
                    "Room sweeper received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "meet.task.room_sweeper", "Room sweeper stopped");
}

/// Run a single sweep iteration.
///
/// Separated from the main loop to allow direct testing. No retries within
/// a tick; failures are logged and the next tick proceeds independently.
pub(crate) async fn run_sweep(pool: &PgPool) {
    match RoomsRepository::retire_expired(pool).await {
        Ok((rooms, participants)) => {
            if rooms > 0 {
                info!(
                    target: "meet.task.room_sweeper",
                    rooms = rooms,
                    participants = participants,
                    "Sweep retired expired rooms"
                );
            }
        }
        Err(e) => {
            tracing::error!(
                target: "meet.task.room_sweeper",
                error = %e,
                "Sweep failed, will retry on next tick"
            );
        }
    }
}
