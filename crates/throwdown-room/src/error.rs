//! Error types for the room layer.

use throwdown_protocol::RoomCode;
use throwdown_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Both seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The connection already sits in a live room.
    #[error("{0} already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomCode),

    /// Every generated code collided with a live room.
    #[error("no free room code after {attempts} attempts")]
    CodesExhausted { attempts: u32 },
}
