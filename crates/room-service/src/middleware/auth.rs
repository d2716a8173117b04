//! Authentication middleware.
//!
//! Extracts the Bearer token from the Authorization header, validates it
//! with the token verifier, and injects `UserClaims` into request
//! extensions.
//!
//! Two variants exist: `require_auth` for protected routes, and
//! `optional_auth` for public routes where authentication changes behavior
//! (guest vs authenticated room creation) rather than gating access. A
//! missing header on an optional route means anonymous; a present but
//! invalid token is still rejected rather than silently downgraded.

use crate::errors::ServiceError;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use common::jwt::UserClaims;
use std::sync::Arc;
use tracing::instrument;

/// Authentication middleware that requires a valid bearer token.
///
/// # Response
///
/// - 401 Unauthorized with WWW-Authenticate header if the token is missing
///   or invalid
/// - Continues to the next handler with claims in extensions otherwise
#[instrument(skip_all, name = "meet.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ServiceError> {
    let token = bearer_token(&req)?.ok_or_else(|| {
        tracing::debug!(target: "meet.middleware.auth", "Missing Authorization header");
        ServiceError::InvalidToken("Missing Authorization header".to_string())
    })?;

    let claims = state.verifier.verify(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Authentication middleware for routes where a token is optional.
///
/// Absent header: the request proceeds anonymously (no claims extension).
/// Present header: the token must be valid; failures are rejected exactly
/// as on protected routes.
#[instrument(skip_all, name = "meet.middleware.optional_auth")]
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(token) = bearer_token(&req)? {
        let claims = state.verifier.verify(token)?;
        req.extensions_mut().insert(claims);
    }

    Ok(next.run(req).await)
}

/// Extract the Bearer token from the Authorization header, if present.
///
/// A header that exists but is not `Bearer <token>` is an error on both
/// middleware variants.
fn bearer_token(req: &Request) -> Result<Option<&str>, ServiceError> {
    let Some(header) = req.headers().get("authorization") else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| {
        ServiceError::InvalidToken("Invalid Authorization header format".to_string())
    })?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "meet.middleware.auth", "Invalid Authorization header format");
        ServiceError::InvalidToken("Invalid Authorization header format".to_string())
    })?;

    Ok(Some(token))
}

/// Extension trait for extracting claims from a request.
pub trait ClaimsExt {
    /// Get the authenticated claims from request extensions.
    ///
    /// Returns `None` if no auth middleware stored claims for this request.
    fn claims(&self) -> Option<&UserClaims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&UserClaims> {
        self.extensions().get::<UserClaims>()
    }
}
