//! A single two-seat room and its round state.
//!
//! [`Room`] is plain data plus the transitions of [`RoomPhase`]. It never
//! touches the network: outbound messages go into each participant's
//! [`Outbox`], which the connection's writer task drains.

use throwdown_protocol::{Move, PlayerSlot, RoomCode, ServerMessage, Winner};
use throwdown_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::{RoomError, RoomPhase, rules};

/// Channel sender for delivering outbound messages to a connection.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A connection as seen by the lobby: its id plus a way to reach it.
#[derive(Debug, Clone)]
pub struct Participant {
    id: ConnectionId,
    outbox: Outbox,
}

impl Participant {
    pub fn new(id: ConnectionId, outbox: Outbox) -> Self {
        Self { id, outbox }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues `msg` for delivery. Silently drops it if the connection's
    /// writer is gone.
    pub fn send(&self, msg: ServerMessage) {
        if self.outbox.send(msg).is_err() {
            tracing::trace!(conn_id = %self.id, "outbox closed, message dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// Round reports and snapshots
// ---------------------------------------------------------------------------

/// Result of [`Room::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The room is not collecting moves right now.
    NotAccepting,
    /// This seat already moved this round.
    AlreadyMoved,
    /// Recorded; still waiting on the other seat.
    Recorded,
    /// Recorded, and both moves are in. The room is now `Resolving`.
    BothIn,
}

/// What happened when a round was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// 1-based number of the round that just resolved.
    pub round: u32,
    pub winner: Winner,
    /// Moves as `[p1, p2]`.
    pub moves: [Move; 2],
    /// Scores after this round as `[p1, p2]`.
    pub scores: [u32; 2],
    /// Set when this was the last round of the match.
    pub match_winner: Option<Winner>,
}

/// Read-only view of a room, for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub serial: u64,
    pub phase: RoomPhase,
    pub participants: [Option<ConnectionId>; 2],
    pub moved: [bool; 2],
    pub scores: [u32; 2],
    pub rounds_completed: u32,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One match between two seats.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    serial: u64,
    phase: RoomPhase,
    seats: [Option<Participant>; 2],
    moves: [Option<Move>; 2],
    scores: [u32; 2],
    rounds_completed: u32,
}

impl Room {
    /// A room with only the first seat taken.
    pub(crate) fn open(code: RoomCode, serial: u64, player1: Participant) -> Self {
        Self {
            code,
            serial,
            phase: RoomPhase::WaitingForOpponent,
            seats: [Some(player1), None],
            moves: [None, None],
            scores: [0, 0],
            rounds_completed: 0,
        }
    }

    /// A room with both seats taken, ready for moves.
    pub(crate) fn full(
        code: RoomCode,
        serial: u64,
        player1: Participant,
        player2: Participant,
    ) -> Self {
        Self {
            code,
            serial,
            phase: RoomPhase::AwaitingMoves,
            seats: [Some(player1), Some(player2)],
            moves: [None, None],
            scores: [0, 0],
            rounds_completed: 0,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn has_moved(&self, slot: PlayerSlot) -> bool {
        self.moves[slot.index()].is_some()
    }

    pub fn is_full(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    pub fn participant(&self, slot: PlayerSlot) -> Option<&Participant> {
        self.seats[slot.index()].as_ref()
    }

    /// Seated participants in slot order.
    pub fn participants(&self) -> impl Iterator<Item = (PlayerSlot, &Participant)> {
        PlayerSlot::ALL
            .into_iter()
            .filter_map(|slot| self.participant(slot).map(|p| (slot, p)))
    }

    /// Which seat `conn` occupies, if any.
    pub fn slot_of(&self, conn: ConnectionId) -> Option<PlayerSlot> {
        self.participants()
            .find(|(_, p)| p.id() == conn)
            .map(|(slot, _)| slot)
    }

    /// The participant across the table from `conn`.
    pub fn opponent_of(&self, conn: ConnectionId) -> Option<&Participant> {
        let slot = self.slot_of(conn)?;
        self.participant(slot.other())
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            serial: self.serial,
            phase: self.phase,
            participants: PlayerSlot::ALL.map(|slot| self.participant(slot).map(Participant::id)),
            moved: PlayerSlot::ALL.map(|slot| self.has_moved(slot)),
            scores: self.scores,
            rounds_completed: self.rounds_completed,
        }
    }

    // -- Transitions --------------------------------------------------------

    /// Takes the empty second seat. Leaves the room untouched on failure.
    pub(crate) fn seat_opponent(&mut self, player2: Participant) -> Result<(), RoomError> {
        if !self.phase.is_joinable() || self.is_full() {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        self.seats[PlayerSlot::P2.index()] = Some(player2);
        self.transition(RoomPhase::AwaitingMoves);
        Ok(())
    }

    /// Records `hand` for `slot` in the current round.
    pub(crate) fn submit(&mut self, slot: PlayerSlot, hand: Move) -> Submission {
        if !self.phase.accepts_moves() {
            return Submission::NotAccepting;
        }
        let entry = &mut self.moves[slot.index()];
        if entry.is_some() {
            return Submission::AlreadyMoved;
        }
        *entry = Some(hand);

        if self.moves.iter().all(Option::is_some) {
            self.transition(RoomPhase::Resolving);
            Submission::BothIn
        } else {
            Submission::Recorded
        }
    }

    /// Judges the pending round, clears the moves and advances the phase.
    ///
    /// Returns `None` unless the room is `Resolving` with both moves set.
    pub(crate) fn settle(&mut self, rounds_per_match: u32) -> Option<RoundReport> {
        if self.phase != RoomPhase::Resolving {
            return None;
        }
        let [Some(p1), Some(p2)] = self.moves else {
            return None;
        };

        let winner = rules::judge(p1, p2);
        if let Some(slot) = winner.slot() {
            self.scores[slot.index()] += 1;
        }
        self.moves = [None, None];
        self.rounds_completed += 1;

        let match_winner = if self.rounds_completed >= rounds_per_match {
            self.transition(RoomPhase::Complete);
            Some(rules::match_winner(self.scores))
        } else {
            self.transition(RoomPhase::AwaitingMoves);
            None
        };

        Some(RoundReport {
            round: self.rounds_completed,
            winner,
            moves: [p1, p2],
            scores: self.scores,
            match_winner,
        })
    }

    // -- Outbound -----------------------------------------------------------

    /// Sends `msg` to every seated participant.
    pub(crate) fn broadcast(&self, msg: ServerMessage) {
        for (_, participant) in self.participants() {
            participant.send(msg.clone());
        }
    }

    /// Tells each seat which slot it holds in this room.
    pub(crate) fn announce_match(&self) {
        for (slot, participant) in self.participants() {
            participant.send(ServerMessage::MatchFound {
                room_id: self.code.clone(),
                player: slot,
            });
        }
    }

    /// Sends the round result, round end and (if any) game over.
    ///
    /// The result is perspective-adjusted: each recipient sees its own
    /// move first.
    pub(crate) fn announce_round(&self, report: &RoundReport) {
        for (slot, participant) in self.participants() {
            participant.send(ServerMessage::RoundResult {
                winner: report.winner,
                own_move: report.moves[slot.index()],
                opponent_move: report.moves[slot.other().index()],
            });
        }
        self.broadcast(ServerMessage::RoundEnd {
            round: report.round,
        });
        if let Some(winner) = report.match_winner {
            self.broadcast(ServerMessage::GameOver { winner });
        }
    }

    fn transition(&mut self, next: RoomPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal room transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!(code = %self.code, from = %self.phase, to = %next, "room phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use throwdown_protocol::Move::{Paper, Rock, Scissors};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn participant(id: u64) -> (Participant, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Participant::new(ConnectionId::new(id), tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn full_room() -> (
        Room,
        UnboundedReceiver<ServerMessage>,
        UnboundedReceiver<ServerMessage>,
    ) {
        let (a, rx_a) = participant(1);
        let (b, rx_b) = participant(2);
        (Room::full("ROOM01".into(), 1, a, b), rx_a, rx_b)
    }

    fn play(room: &mut Room, p1: Move, p2: Move) -> RoundReport {
        assert_eq!(room.submit(PlayerSlot::P1, p1), Submission::Recorded);
        assert_eq!(room.submit(PlayerSlot::P2, p2), Submission::BothIn);
        room.settle(3).expect("round should settle")
    }

    #[test]
    fn test_open_room_waits_for_opponent() {
        let (a, _rx) = participant(1);
        let room = Room::open("ROOM01".into(), 1, a);
        assert_eq!(room.phase(), RoomPhase::WaitingForOpponent);
        assert!(!room.is_full());
        assert_eq!(room.slot_of(ConnectionId::new(1)), Some(PlayerSlot::P1));
        assert!(room.opponent_of(ConnectionId::new(1)).is_none());
    }

    #[test]
    fn test_full_room_accepts_moves() {
        let (room, _a, _b) = full_room();
        assert_eq!(room.phase(), RoomPhase::AwaitingMoves);
        assert!(room.is_full());
        assert_eq!(room.slot_of(ConnectionId::new(2)), Some(PlayerSlot::P2));
        assert_eq!(
            room.opponent_of(ConnectionId::new(2)).map(Participant::id),
            Some(ConnectionId::new(1))
        );
        assert_eq!(room.slot_of(ConnectionId::new(9)), None);
    }

    #[test]
    fn test_seat_opponent_once() {
        let (a, _rx_a) = participant(1);
        let (b, _rx_b) = participant(2);
        let (c, _rx_c) = participant(3);
        let mut room = Room::open("ROOM01".into(), 1, a);

        room.seat_opponent(b).unwrap();
        assert_eq!(room.phase(), RoomPhase::AwaitingMoves);

        let err = room.seat_opponent(c).unwrap_err();
        assert!(matches!(err, RoomError::RoomFull(_)));
        assert_eq!(
            room.participant(PlayerSlot::P2).map(Participant::id),
            Some(ConnectionId::new(2))
        );
    }

    #[test]
    fn test_moves_ignored_before_opponent_arrives() {
        let (a, _rx) = participant(1);
        let mut room = Room::open("ROOM01".into(), 1, a);
        assert_eq!(room.submit(PlayerSlot::P1, Rock), Submission::NotAccepting);
        assert!(!room.has_moved(PlayerSlot::P1));
    }

    #[test]
    fn test_second_move_from_same_seat_ignored() {
        let (mut room, _a, _b) = full_room();
        assert_eq!(room.submit(PlayerSlot::P1, Rock), Submission::Recorded);
        assert_eq!(room.submit(PlayerSlot::P1, Paper), Submission::AlreadyMoved);
        assert_eq!(room.submit(PlayerSlot::P2, Scissors), Submission::BothIn);
        assert_eq!(room.phase(), RoomPhase::Resolving);

        let report = room.settle(3).unwrap();
        assert_eq!(report.moves, [Rock, Scissors]);
        assert_eq!(report.winner, Winner::P1);
    }

    #[test]
    fn test_moves_ignored_while_resolving() {
        let (mut room, _a, _b) = full_room();
        room.submit(PlayerSlot::P1, Rock);
        room.submit(PlayerSlot::P2, Rock);
        assert_eq!(room.submit(PlayerSlot::P1, Paper), Submission::NotAccepting);
    }

    #[test]
    fn test_settle_requires_resolving() {
        let (mut room, _a, _b) = full_room();
        assert!(room.settle(3).is_none());
        room.submit(PlayerSlot::P1, Rock);
        assert!(room.settle(3).is_none());
        assert!(room.has_moved(PlayerSlot::P1));
    }

    #[test]
    fn test_settle_scores_and_resets() {
        let (mut room, _a, _b) = full_room();

        let report = play(&mut room, Paper, Rock);
        assert_eq!(report.round, 1);
        assert_eq!(report.scores, [1, 0]);
        assert_eq!(report.match_winner, None);
        assert_eq!(room.phase(), RoomPhase::AwaitingMoves);
        assert!(!room.has_moved(PlayerSlot::P1));
        assert!(!room.has_moved(PlayerSlot::P2));

        let report = play(&mut room, Rock, Rock);
        assert_eq!(report.winner, Winner::Draw);
        assert_eq!(report.scores, [1, 0], "draws leave scores alone");
        assert_eq!(room.snapshot().rounds_completed, 2);
    }

    #[test]
    fn test_last_round_completes_match() {
        let (mut room, _a, _b) = full_room();
        play(&mut room, Rock, Paper);
        play(&mut room, Rock, Rock);
        let report = play(&mut room, Scissors, Paper);

        assert_eq!(report.round, 3);
        assert_eq!(report.scores, [1, 1]);
        assert_eq!(report.match_winner, Some(Winner::Draw));
        assert_eq!(room.phase(), RoomPhase::Complete);
        assert_eq!(room.submit(PlayerSlot::P1, Rock), Submission::NotAccepting);
    }

    #[test]
    fn test_announce_round_is_perspective_adjusted() {
        let (mut room, mut rx_a, mut rx_b) = full_room();
        let report = play(&mut room, Rock, Scissors);
        room.announce_round(&report);

        assert_eq!(
            drain(&mut rx_a),
            vec![
                ServerMessage::RoundResult {
                    winner: Winner::P1,
                    own_move: Rock,
                    opponent_move: Scissors,
                },
                ServerMessage::RoundEnd { round: 1 },
            ]
        );
        assert_eq!(
            drain(&mut rx_b),
            vec![
                ServerMessage::RoundResult {
                    winner: Winner::P1,
                    own_move: Scissors,
                    opponent_move: Rock,
                },
                ServerMessage::RoundEnd { round: 1 },
            ]
        );
    }

    #[test]
    fn test_announce_match_tells_each_seat_its_slot() {
        let (room, mut rx_a, mut rx_b) = full_room();
        room.announce_match();
        assert_eq!(
            drain(&mut rx_a),
            vec![ServerMessage::MatchFound {
                room_id: "ROOM01".into(),
                player: PlayerSlot::P1,
            }]
        );
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerMessage::MatchFound {
                room_id: "ROOM01".into(),
                player: PlayerSlot::P2,
            }]
        );
    }

    #[test]
    fn test_send_to_closed_outbox_is_silent() {
        let (a, rx) = participant(1);
        drop(rx);
        a.send(ServerMessage::PlayerLeft);
    }

    #[test]
    fn test_snapshot() {
        let (mut room, _a, _b) = full_room();
        room.submit(PlayerSlot::P2, Paper);
        let snap = room.snapshot();
        assert_eq!(snap.code.as_str(), "ROOM01");
        assert_eq!(snap.moved, [false, true]);
        assert_eq!(
            snap.participants,
            [Some(ConnectionId::new(1)), Some(ConnectionId::new(2))]
        );
    }
}
