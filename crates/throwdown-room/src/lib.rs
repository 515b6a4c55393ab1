//! Rooms, matchmaking and rounds for Throwdown.
//!
//! Two players meet in a [`Room`], either by asking for a stranger
//! ([`MatchmakingQueue`]) or by sharing a room code. Each round both submit
//! a move; after a short reveal delay the round is judged, and after
//! [`MatchConfig::rounds_per_match`] rounds the match ends and the room is
//! removed.
//!
//! # Key types
//!
//! - [`Lobby`]: the shared async handle every connection talks to
//! - [`Arena`]: the synchronous core the lobby serializes access to
//! - [`RoomRegistry`]: live rooms by code and by connection
//! - [`Room`] / [`RoomPhase`]: one match and its state machine
//! - [`CodeGenerator`]: where room codes come from

mod arena;
mod code;
mod config;
mod error;
mod lobby;
mod matchmaking;
mod registry;
mod room;
pub mod rules;

pub use arena::{Arena, MoveOutcome};
pub use code::{CodeGenerator, RandomCodeGenerator, ROOM_CODE_ALPHABET};
pub use config::{MatchConfig, RoomPhase};
pub use error::RoomError;
pub use lobby::Lobby;
pub use matchmaking::{MatchmakingQueue, Offer};
pub use registry::RoomRegistry;
pub use room::{Outbox, Participant, Room, RoomSnapshot, RoundReport, Submission};
