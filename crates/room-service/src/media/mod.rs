//! Media server integration.
//!
//! The core only needs two things from the conferencing platform: signed
//! join credentials for clients, and a handful of administrative operations
//! (roster, forced removal, recording) gated by the authorization policy.
//!
//! # Components
//!
//! - `grant` - Video grants and join-credential signing
//! - `client` - `MediaServer` trait, HTTP implementation, and test mock

pub mod client;
pub mod grant;

pub use client::{HttpMediaServer, MediaParticipant, MediaServer, MockMediaServer, RecordingInfo, RecordingStatus};
pub use grant::{sign_join_token, VideoGrant, JOIN_TOKEN_TTL_SECONDS};
