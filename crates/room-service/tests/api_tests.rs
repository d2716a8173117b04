//! Router-level API tests.
//!
//! Drives the real Axum router with in-process requests: signed HS256 test
//! tokens for the auth middleware, and the in-memory media server mock for
//! the proxy endpoints.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::jwt::UserClaims;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use room_service::config::Config;
use room_service::media::{MediaParticipant, MockMediaServer};
use room_service::routes::{build_routes, AppState};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN_SECRET: &str = "test-secret";
const MEDIA_API_KEY: &str = "devkey";
const MEDIA_API_SECRET: &str = "devsecret";

fn test_config() -> Config {
    let vars = HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://test/test".to_string(),
        ),
        ("MEET_TOKEN_SECRET".to_string(), TOKEN_SECRET.to_string()),
        (
            "MEET_MEDIA_API_KEY".to_string(),
            MEDIA_API_KEY.to_string(),
        ),
        (
            "MEET_MEDIA_API_SECRET".to_string(),
            MEDIA_API_SECRET.to_string(),
        ),
    ]);

    Config::from_vars(&vars).expect("Test config should load")
}

fn test_app(pool: PgPool) -> (Router, Arc<MockMediaServer>) {
    let media = Arc::new(MockMediaServer::new());
    let state = Arc::new(AppState::new(pool, test_config(), media.clone()));
    (build_routes(state), media)
}

fn user_token(sub: &str, groups: &[&str]) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = UserClaims {
        sub: sub.to_string(),
        email: format!("{sub}@example.com"),
        name: format!("User {sub}"),
        username: sub.to_string(),
        groups: groups.iter().map(|g| (*g).to_string()).collect(),
        exp: now + 3600,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TOKEN_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }

    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

// ============================================================================
// Health
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_reports_ok(pool: PgPool) {
    let (app, _) = test_app(pool);

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "healthy");
}

// ============================================================================
// Room management
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_guest_room(pool: PgPool) {
    let (app, _) = test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/public/rooms",
        None,
        Some(json!({"name": "standup"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "standup");
    assert_eq!(body["is_guest_room"], true);
    assert_eq!(body["max_duration_minutes"], 30);
    assert!(body["expires_at"].is_string());
    assert!(body["time_remaining"].as_i64().unwrap() <= 30);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_authenticated_room(pool: PgPool) {
    let (app, _) = test_app(pool);
    let token = user_token("u1", &[]);

    let (status, body) = send(
        &app,
        "POST",
        "/api/public/rooms",
        Some(&token),
        Some(json!({"name": "team-sync"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_guest_room"], false);
    assert!(body.get("expires_at").is_none());
    assert!(body.get("max_duration_minutes").is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_duplicate_room_conflicts(pool: PgPool) {
    let (app, _) = test_app(pool);

    send(
        &app,
        "POST",
        "/api/public/rooms",
        None,
        Some(json!({"name": "standup"})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/public/rooms",
        None,
        Some(json!({"name": "standup"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_room_rejects_blank_name(pool: PgPool) {
    let (app, _) = test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/public/rooms",
        None,
        Some(json!({"name": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_unknown_room_is_not_found(pool: PgPool) {
    let (app, _) = test_app(pool);

    let (status, body) = send(&app, "GET", "/api/public/rooms/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_join_leave_roster_flow(pool: PgPool) {
    let (app, _) = test_app(pool);

    send(
        &app,
        "POST",
        "/api/public/rooms",
        None,
        Some(json!({"name": "standup"})),
    )
    .await;

    let (status, joined) = send(
        &app,
        "POST",
        "/api/public/rooms/standup/join",
        None,
        Some(json!({"identity": "alice", "name": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["identity"], "alice");
    assert_eq!(joined["is_guest"], true);

    // Repeated join returns the same participant id
    let (_, rejoined) = send(
        &app,
        "POST",
        "/api/public/rooms/standup/join",
        None,
        Some(json!({"identity": "alice", "name": "Alice"})),
    )
    .await;
    assert_eq!(rejoined["participant_id"], joined["participant_id"]);

    let (status, roster) =
        send(&app, "GET", "/api/public/rooms/standup/participants", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster["count"], 1);

    let (status, _) = send(
        &app,
        "POST",
        "/api/public/rooms/standup/leave/alice",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, roster) =
        send(&app, "GET", "/api/public/rooms/standup/participants", None, None).await;
    assert_eq!(roster["count"], 0);
}

// ============================================================================
// Authentication behavior
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_protected_route_requires_token(pool: PgPool) {
    let (app, _) = test_app(pool);

    let (status, body) = send(&app, "GET", "/api/rooms/standup/stats", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_protected_route_rejects_garbage_token(pool: PgPool) {
    let (app, _) = test_app(pool);

    let (status, _) = send(
        &app,
        "GET",
        "/api/rooms/standup/stats",
        Some("not-a-jwt"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_optional_route_rejects_garbage_token(pool: PgPool) {
    let (app, _) = test_app(pool);

    // A present-but-invalid token must not silently downgrade to guest
    let (status, _) = send(
        &app,
        "POST",
        "/api/public/rooms",
        Some("not-a-jwt"),
        Some(json!({"name": "standup"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Join credentials
// ============================================================================

fn decode_join_token(token: &str) -> Value {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_nbf = false;
    jsonwebtoken::decode::<Value>(
        token,
        &DecodingKey::from_secret(MEDIA_API_SECRET.as_bytes()),
        &validation,
    )
    .expect("Join token should decode with the media secret")
    .claims
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_generate_token_carries_room_grant(pool: PgPool) {
    let (app, _) = test_app(pool);
    let token = user_token("u1", &[]);

    send(
        &app,
        "POST",
        "/api/public/rooms",
        Some(&token),
        Some(json!({"name": "team-sync"})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/rooms/team-sync/token",
        Some(&token),
        Some(json!({"can_publish": true, "can_subscribe": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room_name"], "team-sync");
    // Identity defaults to the caller's subject
    assert_eq!(body["identity"], "u1");

    let claims = decode_join_token(body["token"].as_str().unwrap());
    assert_eq!(claims["iss"], MEDIA_API_KEY);
    assert_eq!(claims["sub"], "u1");
    assert_eq!(claims["video"]["room"], "team-sync");
    assert_eq!(claims["video"]["room_join"], true);
    assert_eq!(claims["video"]["can_publish"], true);
    // Recording not requested: capability absent
    assert!(claims["video"].get("can_publish_data").is_none());
    assert!(claims["metadata"].as_str().unwrap().contains("u1"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_generate_token_gates_recording_capability(pool: PgPool) {
    let (app, _) = test_app(pool);
    let plain = user_token("u1", &[]);
    let recorder = user_token("u2", &["recording"]);

    send(
        &app,
        "POST",
        "/api/public/rooms",
        Some(&plain),
        Some(json!({"name": "team-sync"})),
    )
    .await;

    // Unprivileged caller requesting recording: silently downgraded
    let (_, body) = send(
        &app,
        "POST",
        "/api/rooms/team-sync/token",
        Some(&plain),
        Some(json!({"can_record": true})),
    )
    .await;
    let claims = decode_join_token(body["token"].as_str().unwrap());
    assert!(claims["video"].get("can_publish_data").is_none());

    // Recording group: capability granted
    let (_, body) = send(
        &app,
        "POST",
        "/api/rooms/team-sync/token",
        Some(&recorder),
        Some(json!({"can_record": true})),
    )
    .await;
    let claims = decode_join_token(body["token"].as_str().unwrap());
    assert_eq!(claims["video"]["can_publish_data"], true);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_generate_token_for_unknown_room_is_not_found(pool: PgPool) {
    let (app, _) = test_app(pool);
    let token = user_token("u1", &[]);

    let (status, _) = send(
        &app,
        "POST",
        "/api/rooms/nope/token",
        Some(&token),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Extension and deactivation
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_extend_guest_room_via_api(pool: PgPool) {
    let (app, _) = test_app(pool);
    let token = user_token("u1", &[]);

    let (_, created) = send(
        &app,
        "POST",
        "/api/public/rooms",
        None,
        Some(json!({"name": "standup"})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/rooms/standup/extend",
        Some(&token),
        Some(json!({"additional_minutes": 10})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let before = chrono::DateTime::parse_from_rfc3339(created["expires_at"].as_str().unwrap())
        .expect("Deadline should parse");
    let after = chrono::DateTime::parse_from_rfc3339(body["expires_at"].as_str().unwrap())
        .expect("Deadline should parse");
    assert_eq!(after - before, chrono::Duration::minutes(10));
    assert!(body["time_remaining"].as_i64().unwrap() > 30);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_extend_unlimited_room_is_invalid_operation(pool: PgPool) {
    let (app, _) = test_app(pool);
    let token = user_token("u1", &[]);

    send(
        &app,
        "POST",
        "/api/public/rooms",
        Some(&token),
        Some(json!({"name": "team-sync"})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/rooms/team-sync/extend",
        Some(&token),
        Some(json!({"additional_minutes": 10})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_OPERATION");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_deactivate_room_owner_and_admin_paths(pool: PgPool) {
    let (app, _) = test_app(pool);
    let owner = user_token("u1", &[]);
    let stranger = user_token("u2", &[]);
    let admin = user_token("u3", &["meet-admin"]);

    send(
        &app,
        "POST",
        "/api/public/rooms",
        Some(&owner),
        Some(json!({"name": "team-sync"})),
    )
    .await;

    // Unprivileged non-owner is refused
    let (status, body) = send(&app, "DELETE", "/api/rooms/team-sync", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Owner may deactivate
    let (status, _) = send(&app, "DELETE", "/api/rooms/team-sync", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", "/api/public/rooms/team-sync", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Admin may deactivate a room they don't own
    send(
        &app,
        "POST",
        "/api/public/rooms",
        Some(&stranger),
        Some(json!({"name": "retro"})),
    )
    .await;
    let (status, _) = send(&app, "DELETE", "/api/rooms/retro", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// ============================================================================
// Media proxy operations
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_recording_lifecycle_with_policy(pool: PgPool) {
    let (app, _) = test_app(pool);
    let plain = user_token("u1", &[]);
    let recorder = user_token("u2", &["recording"]);

    // No recording group: refused
    let (status, body) = send(
        &app,
        "POST",
        "/api/rooms/standup/recording/start",
        Some(&plain),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "Recording access required");

    // Recording group: full lifecycle against the mock
    let (status, started) = send(
        &app,
        "POST",
        "/api/rooms/standup/recording/start",
        Some(&recorder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "active");

    let (status, _) = send(
        &app,
        "POST",
        "/api/rooms/standup/recording/start",
        Some(&recorder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, stopped) = send(
        &app,
        "POST",
        "/api/rooms/standup/recording/stop",
        Some(&recorder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["status"], "ended");
    assert_eq!(stopped["recording_id"], started["recording_id"]);

    let (status, _) = send(
        &app,
        "POST",
        "/api/rooms/standup/recording/stop",
        Some(&recorder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_forced_removal_requires_admin(pool: PgPool) {
    let (app, media) = test_app(pool);
    let plain = user_token("u1", &["recording"]);
    let admin = user_token("u2", &["admin"]);

    media.set_participants(
        "standup",
        vec![MediaParticipant {
            identity: "alice".to_string(),
            name: "Alice".to_string(),
        }],
    );

    // Recording group is not enough for removal
    let (status, _) = send(
        &app,
        "DELETE",
        "/api/rooms/standup/participants/alice",
        Some(&plain),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/rooms/standup/participants/alice",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Roster is empty afterwards
    let (status, roster) = send(
        &app,
        "GET",
        "/api/rooms/standup/participants",
        Some(&plain),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster["count"], 0);
}
