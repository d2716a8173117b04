//! Bearer token verification.
//!
//! Validates the HS256 tokens the backend mints after the SSO exchange and
//! returns the caller's claims. Size limits and clock-skew validation come
//! from `common::jwt`.

use crate::errors::ServiceError;
use common::jwt::{validate_iat, validate_size, UserClaims};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::time::Duration;

/// Verifier for bearer tokens presented on API requests.
///
/// Cheap to clone; holds only the decoding key and validation parameters.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    clock_skew: Duration,
}

impl TokenVerifier {
    /// Create a verifier for the given shared secret.
    ///
    /// `clock_skew_seconds` must be positive (enforced by config loading);
    /// it is applied both as `exp` leeway and as the `iat` future tolerance.
    pub fn new(secret: &str, clock_skew_seconds: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        #[allow(clippy::cast_sign_loss)]
        let skew_secs = clock_skew_seconds.max(0) as u64;
        validation.leeway = skew_secs;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock_skew: Duration::from_secs(skew_secs),
        }
    }

    /// Verify a bearer token and return its claims.
    ///
    /// Validation order: size cap first (no parsing of oversized input),
    /// then signature and `exp`, then the `iat` future check.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidToken` with a generic message on any
    /// failure; the specific reason is logged at debug level.
    pub fn verify(&self, token: &str) -> Result<UserClaims, ServiceError> {
        validate_size(token).map_err(|e| ServiceError::InvalidToken(e.to_string()))?;

        let data = decode::<UserClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                tracing::debug!(target: "meet.auth", error = %e, "Token validation failed");
                ServiceError::InvalidToken("The access token is invalid or expired".to_string())
            },
        )?;

        validate_iat(data.claims.iat, self.clock_skew)
            .map_err(|e| ServiceError::InvalidToken(e.to_string()))?;

        Ok(data.claims)
    }
}
