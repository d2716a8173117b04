//! Database repositories for the room service.
//!
//! Repositories expose row-level operations over the PostgreSQL store. All
//! queries use parameterized statements, mutations are guarded conditional
//! updates, and retirement is a soft delete (`is_active` / `left_at`).

mod participants;
mod rooms;

pub use participants::ParticipantsRepository;
pub use rooms::RoomsRepository;
