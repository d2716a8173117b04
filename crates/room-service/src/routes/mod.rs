//! HTTP routes for the room service.
//!
//! Defines the Axum router and application state. Room management routes
//! live under `/api/public` behind the optional-auth middleware
//! (authentication changes behavior, not access); media and administrative
//! routes under `/api` require a valid bearer token.

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::handlers;
use crate::media::MediaServer;
use crate::middleware::{optional_auth, require_auth};
use crate::services::RoomService;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Request timeout applied to every route.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application state shared across all handlers.
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Room lifecycle manager.
    pub rooms: RoomService,

    /// Bearer token verifier.
    pub verifier: TokenVerifier,

    /// Media server client.
    pub media: Arc<dyn MediaServer>,
}

impl AppState {
    /// Assemble application state from its parts.
    pub fn new(pool: PgPool, config: Config, media: Arc<dyn MediaServer>) -> Self {
        let rooms = RoomService::new(pool.clone());
        let verifier = TokenVerifier::new(&config.token_secret, config.jwt_clock_skew_seconds);

        Self {
            pool,
            config,
            rooms,
            verifier,
            media,
        }
    }
}

/// Build the application routes.
///
/// Layer order (bottom-to-top execution): TimeoutLayer, then TraceLayer,
/// then per-group auth middleware.
pub fn build_routes(state: Arc<AppState>) -> Router {
    // Public room management routes: optional authentication
    let public_routes = Router::new()
        .route("/api/public/rooms", post(handlers::rooms::create_room))
        .route("/api/public/rooms/:name", get(handlers::rooms::get_room))
        .route(
            "/api/public/rooms/:name/join",
            post(handlers::rooms::join_room),
        )
        .route(
            "/api/public/rooms/:name/leave/:identity",
            post(handlers::rooms::leave_room),
        )
        .route(
            "/api/public/rooms/:name/participants",
            get(handlers::rooms::list_participants),
        )
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    // Protected routes: bearer token required
    let protected_routes = Router::new()
        .route(
            "/api/rooms/:name/token",
            post(handlers::media::generate_token),
        )
        .route(
            "/api/rooms/:name/participants",
            get(handlers::media::media_participants),
        )
        .route(
            "/api/rooms/:name/participants/:identity",
            delete(handlers::media::remove_media_participant),
        )
        .route(
            "/api/rooms/:name/recording/start",
            post(handlers::media::start_recording),
        )
        .route(
            "/api/rooms/:name/recording/stop",
            post(handlers::media::stop_recording),
        )
        .route(
            "/api/rooms/:name/extend",
            post(handlers::rooms::extend_room),
        )
        .route("/api/rooms/:name", delete(handlers::rooms::deactivate_room))
        .route("/api/rooms/:name/stats", get(handlers::rooms::room_stats))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
}
