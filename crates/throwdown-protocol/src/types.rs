//! Core protocol types for Throwdown's wire format.
//!
//! Every type in this module is serialized to JSON and sent over a
//! WebSocket. The shapes are fixed by the browser client:
//!
//! ```text
//! → {"type":"JOIN_ROOM","roomId":"K3Q9ZD"}
//! ← {"type":"MATCH_FOUND","roomId":"K3Q9ZD","player":"p2"}
//! → {"type":"MOVE","move":"paper"}
//! ← {"type":"ROUND_RESULT","winner":"p2","p1Move":"paper","p2Move":"rock"}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The short code that identifies a live room, e.g. `"K3Q9ZD"`.
///
/// Codes are only unique among rooms that exist at the same time; once a
/// room is removed its code may be handed out again.
///
/// `#[serde(transparent)]` makes this serialize as the bare string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a raw code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Which seat in a room a participant occupies.
///
/// `p1` is the room creator (or the player who was already waiting for a
/// stranger); `p2` is the one who joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerSlot {
    #[serde(rename = "p1")]
    P1,
    #[serde(rename = "p2")]
    P2,
}

impl PlayerSlot {
    /// Both slots, in seat order.
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::P1, PlayerSlot::P2];

    /// The opposing seat.
    pub fn other(self) -> Self {
        match self {
            Self::P1 => Self::P2,
            Self::P2 => Self::P1,
        }
    }

    /// Zero-based seat index, handy for `[T; 2]` per-seat storage.
    pub fn index(self) -> usize {
        match self {
            Self::P1 => 0,
            Self::P2 => 1,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P1 => f.write_str("p1"),
            Self::P2 => f.write_str("p2"),
        }
    }
}

// ---------------------------------------------------------------------------
// Moves and outcomes
// ---------------------------------------------------------------------------

/// The closed move set. Anything else on the wire fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// Every move, for exhaustive iteration in rules and tests.
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Returns `true` if `self` defeats `other`.
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Paper, Move::Rock)
                | (Move::Scissors, Move::Paper)
        )
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rock => f.write_str("rock"),
            Self::Paper => f.write_str("paper"),
            Self::Scissors => f.write_str("scissors"),
        }
    }
}

/// Outcome of a round or a match, from the neutral seat perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    #[serde(rename = "p1")]
    P1,
    #[serde(rename = "p2")]
    P2,
    Draw,
}

impl Winner {
    /// The winning seat, or `None` for a draw.
    pub fn slot(self) -> Option<PlayerSlot> {
        match self {
            Self::P1 => Some(PlayerSlot::P1),
            Self::P2 => Some(PlayerSlot::P2),
            Self::Draw => None,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P1 => f.write_str("p1"),
            Self::P2 => f.write_str("p2"),
            Self::Draw => f.write_str("draw"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Messages a client sends to the server.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
/// `{ "type": "JOIN_ROOM", "roomId": "K3Q9ZD" }`.
///
/// Unknown `type` values decode to [`ClientMessage::Unknown`] instead of
/// failing, so newer clients can talk to older servers. A known type with
/// bad fields (e.g. `"move": "lizard"`) is still a decode error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Pair me with whoever is waiting, or make me wait.
    FindStranger,

    /// Open a room and give me its code.
    CreateRoom,

    /// Join the room with this code as the second player.
    ///
    /// `None` when `roomId` is missing or not a string. The request still
    /// decodes so the sender can be told the room is invalid.
    JoinRoom {
        #[serde(
            rename = "roomId",
            default,
            deserialize_with = "lenient_room_code",
            skip_serializing_if = "Option::is_none"
        )]
        room_id: Option<RoomCode>,
    },

    /// My move for the current round.
    Move {
        #[serde(rename = "move")]
        hand: Move,
    },

    /// Any `type` this server does not know.
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoomIdField {
    Code(RoomCode),
    Other(serde::de::IgnoredAny),
}

fn lenient_room_code<'de, D>(deserializer: D) -> Result<Option<RoomCode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match RoomIdField::deserialize(deserializer)? {
        RoomIdField::Code(code) => Some(code),
        RoomIdField::Other(_) => None,
    })
}

impl ClientMessage {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FindStranger => "FIND_STRANGER",
            Self::CreateRoom => "CREATE_ROOM",
            Self::JoinRoom { .. } => "JOIN_ROOM",
            Self::Move { .. } => "MOVE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Messages the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// You are queued for a stranger; nobody else is waiting yet.
    WaitingForPlayer,

    /// You have been paired into a room and sit in `player`.
    MatchFound {
        #[serde(rename = "roomId")]
        room_id: RoomCode,
        player: PlayerSlot,
    },

    /// Your room exists; share `room_id` with a friend.
    RoomCreated {
        #[serde(rename = "roomId")]
        room_id: RoomCode,
        player: PlayerSlot,
    },

    /// The room you tried to join does not exist or is full.
    RoomInvalid,

    /// Round `round` (1-based) is open for moves.
    RoundStart { round: u32 },

    /// Result of the round that just resolved.
    ///
    /// `winner` is seat-neutral. The move fields are perspective-adjusted:
    /// `p1Move` always carries the recipient's own move and `p2Move` the
    /// opponent's, whichever seat the recipient sits in.
    RoundResult {
        winner: Winner,
        #[serde(rename = "p1Move")]
        own_move: Move,
        #[serde(rename = "p2Move")]
        opponent_move: Move,
    },

    /// `round` rounds have now been completed.
    RoundEnd { round: u32 },

    /// The match is over.
    GameOver { winner: Winner },

    /// Your opponent disconnected; the room is gone.
    PlayerLeft,
}

impl ServerMessage {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WaitingForPlayer => "WAITING_FOR_PLAYER",
            Self::MatchFound { .. } => "MATCH_FOUND",
            Self::RoomCreated { .. } => "ROOM_CREATED",
            Self::RoomInvalid => "ROOM_INVALID",
            Self::RoundStart { .. } => "ROUND_START",
            Self::RoundResult { .. } => "ROUND_RESULT",
            Self::RoundEnd { .. } => "ROUND_END",
            Self::GameOver { .. } => "GAME_OVER",
            Self::PlayerLeft => "PLAYER_LEFT",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
