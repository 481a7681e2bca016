//! Room tracking session: status handle, status board and the session loop.

pub mod board;
pub mod room_session;
pub mod status;

pub use board::{ParticipantStatusSource, StatusBoard};
pub use room_session::{RoomSession, SessionCommand, SessionStartOptions, SessionTiming};
pub use status::{SessionIdentity, SessionPhase, SessionState, SessionStatusHandle};
