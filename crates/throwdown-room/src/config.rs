//! Match configuration and the room phase machine.

use std::time::Duration;

use tracing::warn;

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room in a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// Rounds in a match. The room is removed after the last one resolves.
    pub rounds_per_match: u32,

    /// Pause between the second move arriving and the round result being
    /// sent, so both players get a visible "reveal" moment.
    pub reveal_delay: Duration,

    /// Characters in a generated room code.
    pub code_length: usize,

    /// How many codes to draw before giving up when every draw collides
    /// with a live room.
    pub max_code_attempts: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            rounds_per_match: 3,
            reveal_delay: Duration::from_secs(1),
            code_length: 6,
            max_code_attempts: 16,
        }
    }
}

impl MatchConfig {
    /// Shortest code we will hand out.
    pub const MIN_CODE_LENGTH: usize = 4;
    /// Longest code we will hand out.
    pub const MAX_CODE_LENGTH: usize = 12;

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by the lobby. Rules:
    /// - `rounds_per_match` at least 1.
    /// - `code_length` within [`Self::MIN_CODE_LENGTH`]..=[`Self::MAX_CODE_LENGTH`].
    /// - `max_code_attempts` at least 1.
    pub fn validated(mut self) -> Self {
        if self.rounds_per_match == 0 {
            warn!("rounds_per_match is 0, using 1");
            self.rounds_per_match = 1;
        }
        let clamped = self
            .code_length
            .clamp(Self::MIN_CODE_LENGTH, Self::MAX_CODE_LENGTH);
        if clamped != self.code_length {
            warn!(
                requested = self.code_length,
                used = clamped,
                "code_length out of range, clamping"
            );
            self.code_length = clamped;
        }
        if self.max_code_attempts == 0 {
            warn!("max_code_attempts is 0, using 1");
            self.max_code_attempts = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its life.
///
/// ```text
/// WaitingForOpponent ──join──→ AwaitingMoves ──both moves──→ Resolving
///                                    ↑                           │
///                                    └──────next round───────────┤
///                                                                ↓
///                                                  Complete (last round)
/// ```
///
/// Rooms created by stranger matchmaking start directly in
/// `AwaitingMoves`. A `Complete` room has already left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomPhase {
    WaitingForOpponent,
    AwaitingMoves,
    Resolving,
    Complete,
}

impl RoomPhase {
    /// Returns `true` if a second player may still take the empty seat.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::WaitingForOpponent)
    }

    /// Returns `true` if moves for the current round are being collected.
    pub fn accepts_moves(&self) -> bool {
        matches!(self, Self::AwaitingMoves)
    }

    /// Returns `true` if moving to `target` is a legal edge.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::WaitingForOpponent, Self::AwaitingMoves)
                | (Self::AwaitingMoves, Self::Resolving)
                | (Self::Resolving, Self::AwaitingMoves)
                | (Self::Resolving, Self::Complete)
        )
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingForOpponent => write!(f, "WaitingForOpponent"),
            Self::AwaitingMoves => write!(f, "AwaitingMoves"),
            Self::Resolving => write!(f, "Resolving"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}
