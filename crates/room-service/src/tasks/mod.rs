//! Background tasks for the room service.
//!
//! # Components
//!
//! - `room_sweeper` - Periodic retirement of expired rooms

pub mod room_sweeper;

pub use room_sweeper::{start_room_sweeper, SweeperConfig};
