//! Service layer for the room backend.
//!
//! # Components
//!
//! - `rooms` - Room lifecycle manager and participant tracker
//! - `authorization` - Group-based policy for privileged actions

pub mod authorization;
pub mod rooms;

pub use authorization::{is_authorized, AdminAction};
pub use rooms::RoomService;
