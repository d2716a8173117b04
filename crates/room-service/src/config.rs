//! Room service configuration.
//!
//! Configuration is loaded from environment variables. Secrets are redacted
//! in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default media server base URL.
pub const DEFAULT_MEDIA_SERVER_URL: &str = "http://localhost:7880";

/// Room service configuration.
///
/// Loaded from environment variables with sensible defaults. The bearer
/// token secret and the media API secret are redacted in Debug output to
/// prevent credential leakage.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// HS256 secret used to validate bearer tokens minted after SSO login.
    pub token_secret: String,

    /// Media server base URL for administration calls.
    pub media_server_url: String,

    /// Media server API key (becomes the `iss` of join credentials).
    pub media_api_key: String,

    /// Media server API secret used to sign join credentials.
    pub media_api_secret: String,

    /// JWT clock skew tolerance in seconds for token validation.
    pub jwt_clock_skew_seconds: i64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("token_secret", &"[REDACTED]")
            .field("media_server_url", &self.media_server_url)
            .field("media_api_key", &self.media_api_key)
            .field("media_api_secret", &"[REDACTED]")
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("MEET_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let token_secret = vars
            .get("MEET_TOKEN_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("MEET_TOKEN_SECRET".to_string()))?
            .clone();

        let media_server_url = vars
            .get("MEET_MEDIA_SERVER_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_MEDIA_SERVER_URL.to_string());

        let media_api_key = vars
            .get("MEET_MEDIA_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("MEET_MEDIA_API_KEY".to_string()))?
            .clone();

        let media_api_secret = vars
            .get("MEET_MEDIA_API_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("MEET_MEDIA_API_SECRET".to_string()))?
            .clone();

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            #[allow(clippy::cast_possible_wrap)]
            let max_skew = MAX_CLOCK_SKEW.as_secs() as i64;
            if value > max_skew {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    max_skew, value
                )));
            }

            value
        } else {
            #[allow(clippy::cast_possible_wrap)]
            let default_skew = DEFAULT_CLOCK_SKEW.as_secs() as i64;
            default_skew
        };

        Ok(Config {
            database_url,
            bind_address,
            token_secret,
            media_server_url,
            media_api_key,
            media_api_secret,
            jwt_clock_skew_seconds,
        })
    }
}
