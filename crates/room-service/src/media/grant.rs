//! Video grants and join-credential signing.
//!
//! Join credentials are HS256 JWTs signed with the media API secret. The
//! media server trusts `iss` to identify the API key and reads the granted
//! capabilities from the `video` claim.

use crate::errors::ServiceError;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Join credential validity window in seconds (6 hours).
pub const JOIN_TOKEN_TTL_SECONDS: i64 = 6 * 60 * 60;

/// Capabilities granted to a media session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoGrant {
    /// Whether the credential admits the holder into the room.
    pub room_join: bool,

    /// Room the grant is scoped to.
    pub room: String,

    /// Whether the holder may publish media.
    pub can_publish: bool,

    /// Whether the holder may subscribe to media.
    pub can_subscribe: bool,

    /// Whether the holder may publish data streams (recording capability).
    /// Absent unless explicitly granted by policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_publish_data: Option<bool>,

    /// Administrative access to the room, used for server-side calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_admin: Option<bool>,
}

/// Claims carried by a join credential.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JoinTokenClaims {
    /// API key identifying the issuer to the media server.
    pub iss: String,

    /// Participant identity.
    pub sub: String,

    /// Participant display name.
    pub name: String,

    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Granted capabilities.
    pub video: VideoGrant,

    /// JSON metadata attached to the participant.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metadata: String,
}

/// Sign a join credential for a participant.
///
/// # Errors
///
/// Returns `ServiceError::Internal` if signing fails.
pub fn sign_join_token(
    api_key: &str,
    api_secret: &str,
    identity: &str,
    name: &str,
    grant: VideoGrant,
    metadata: String,
) -> Result<String, ServiceError> {
    let now = Utc::now().timestamp();

    let claims = JoinTokenClaims {
        iss: api_key.to_string(),
        sub: identity.to_string(),
        name: name.to_string(),
        nbf: now,
        exp: now + JOIN_TOKEN_TTL_SECONDS,
        video: grant,
        metadata,
    };

    sign_claims(&claims, api_secret)
}

/// Sign a short-lived administrative credential for server-side calls.
///
/// # Errors
///
/// Returns `ServiceError::Internal` if signing fails.
pub(crate) fn sign_admin_token(
    api_key: &str,
    api_secret: &str,
    room: &str,
    ttl_seconds: i64,
) -> Result<String, ServiceError> {
    let now = Utc::now().timestamp();

    let claims = JoinTokenClaims {
        iss: api_key.to_string(),
        sub: api_key.to_string(),
        name: String::new(),
        nbf: now,
        exp: now + ttl_seconds,
        video: VideoGrant {
            room: room.to_string(),
            room_admin: Some(true),
            ..VideoGrant::default()
        },
        metadata: String::new(),
    };

    sign_claims(&claims, api_secret)
}

fn sign_claims(claims: &JoinTokenClaims, api_secret: &str) -> Result<String, ServiceError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(target: "meet.media.grant", error = %e, "Failed to sign media credential");
        ServiceError::Internal
    })
}
