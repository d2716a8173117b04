//! HTTP request handlers.
//!
//! # Components
//!
//! - `health` - Liveness and database connectivity
//! - `rooms` - Room lifecycle and participant roster endpoints
//! - `media` - Join credentials and media server proxy operations

pub mod health;
pub mod media;
pub mod rooms;

pub use health::health_check;
