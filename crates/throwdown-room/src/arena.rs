//! Synchronous game coordination: rooms plus the matchmaking queue.
//!
//! Every operation here runs to completion without awaiting. The async
//! [`Lobby`](crate::Lobby) wraps an `Arena` in a mutex and adds the one
//! piece that needs time: the reveal delay before a round resolves.

use throwdown_protocol::{Move, PlayerSlot, RoomCode, ServerMessage};
use throwdown_transport::ConnectionId;

use crate::{
    CodeGenerator, MatchConfig, MatchmakingQueue, Offer, Participant, RoomError, RoomRegistry,
    RoundReport, Submission,
};

/// What [`Arena::submit_move`] did with a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Dropped: no room, not a participant, wrong phase, or already moved.
    Ignored,
    /// Stored; the opponent has not moved yet.
    Recorded,
    /// Both moves are in. Call [`Arena::resolve_round`] with these values
    /// once the reveal delay has passed.
    RoundReady { code: RoomCode, serial: u64 },
}

/// Rooms, the matchmaking queue and the rules that connect them.
#[derive(Debug)]
pub struct Arena {
    registry: RoomRegistry,
    queue: MatchmakingQueue,
    config: MatchConfig,
}

impl Arena {
    pub fn new(config: MatchConfig, codes: Box<dyn CodeGenerator>) -> Self {
        Self {
            registry: RoomRegistry::new(codes, &config),
            queue: MatchmakingQueue::new(),
            config,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &MatchmakingQueue {
        &self.queue
    }

    /// Pairs `player` with the waiting stranger, or makes them wait.
    pub fn find_stranger(&mut self, player: Participant) {
        let conn = player.id();
        if let Some(code) = self.registry.room_of(conn) {
            tracing::debug!(%conn, %code, "FIND_STRANGER from seated connection, ignoring");
            return;
        }

        match self.queue.offer(player.clone()) {
            Offer::Waiting | Offer::AlreadyWaiting => {
                tracing::debug!(%conn, "waiting for a stranger");
                player.send(ServerMessage::WaitingForPlayer);
            }
            Offer::Paired { waiting, newcomer } => {
                let (p1, p2) = (waiting.id(), newcomer.id());
                match self.registry.create_match(waiting.clone(), newcomer) {
                    Ok(code) => {
                        tracing::info!(%code, %p1, %p2, "strangers matched");
                        if let Some(room) = self.registry.get(&code) {
                            room.announce_match();
                        }
                    }
                    Err(e) => {
                        // The waiting player was already told to wait; keep
                        // that true. The newcomer's request is dropped.
                        tracing::warn!(%p1, %p2, error = %e, "failed to open room for strangers");
                        self.queue.offer(waiting);
                    }
                }
            }
        }
    }

    /// Opens a room with `player` in the first seat and sends them its code.
    pub fn create_room(&mut self, player: Participant) -> Result<RoomCode, RoomError> {
        let conn = player.id();
        if let Some(code) = self.registry.room_of(conn) {
            tracing::debug!(%conn, %code, "CREATE_ROOM from seated connection, ignoring");
            return Err(RoomError::AlreadyInRoom(conn, code));
        }
        if self.queue.withdraw(conn) {
            tracing::debug!(%conn, "left matchmaking queue to create a room");
        }

        let code = self.registry.create_room(player.clone())?;
        tracing::info!(%code, %conn, "room created");
        player.send(ServerMessage::RoomCreated {
            room_id: code.clone(),
            player: PlayerSlot::P1,
        });
        Ok(code)
    }

    /// Seats `player` in the room with `code` and starts round one.
    ///
    /// On any failure the requester alone gets `ROOM_INVALID`.
    pub fn join_room(&mut self, player: Participant, code: &RoomCode) -> Result<(), RoomError> {
        let conn = player.id();
        if let Err(e) = self.registry.seat(code, player.clone()) {
            tracing::debug!(%conn, %code, error = %e, "join rejected");
            player.send(ServerMessage::RoomInvalid);
            return Err(e);
        }
        if self.queue.withdraw(conn) {
            tracing::debug!(%conn, "left matchmaking queue to join a room");
        }

        tracing::info!(%code, %conn, "player joined room");
        if let Some(room) = self.registry.get(code) {
            room.announce_match();
            room.broadcast(ServerMessage::RoundStart { round: 1 });
        }
        Ok(())
    }

    /// Records a move from `conn` for its room's current round.
    pub fn submit_move(&mut self, conn: ConnectionId, hand: Move) -> MoveOutcome {
        let Some(code) = self.registry.room_of(conn) else {
            tracing::debug!(%conn, "MOVE without a room, ignoring");
            return MoveOutcome::Ignored;
        };
        let Some(room) = self.registry.get_mut(&code) else {
            return MoveOutcome::Ignored;
        };
        let Some(slot) = room.slot_of(conn) else {
            return MoveOutcome::Ignored;
        };

        match room.submit(slot, hand) {
            Submission::Recorded => {
                tracing::debug!(%code, %slot, "move recorded");
                MoveOutcome::Recorded
            }
            Submission::BothIn => {
                tracing::debug!(%code, "both moves in, resolving");
                MoveOutcome::RoundReady {
                    serial: room.serial(),
                    code,
                }
            }
            rejected => {
                tracing::debug!(%code, %slot, phase = %room.phase(), ?rejected, "move ignored");
                MoveOutcome::Ignored
            }
        }
    }

    /// Settles the pending round of room `code`, announces it, and removes
    /// the room if that was the last round.
    ///
    /// A no-op returning `None` when the room is gone, has been replaced by
    /// another room with the same code, or is not resolving.
    pub fn resolve_round(&mut self, code: &RoomCode, serial: u64) -> Option<RoundReport> {
        let room = match self.registry.get_mut(code) {
            Some(room) if room.serial() == serial => room,
            _ => {
                tracing::debug!(%code, serial, "stale round resolution, ignoring");
                return None;
            }
        };
        let report = room.settle(self.config.rounds_per_match)?;
        room.announce_round(&report);
        tracing::info!(
            %code,
            round = report.round,
            winner = %report.winner,
            p1_score = report.scores[0],
            p2_score = report.scores[1],
            "round resolved"
        );

        if let Some(winner) = report.match_winner {
            self.registry.remove(code);
            tracing::info!(%code, %winner, "match finished");
        }
        Some(report)
    }

    /// Forgets `conn`: leaves the queue, tells the opponent, closes the room.
    ///
    /// Returns the code of the room that was removed, if any.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<RoomCode> {
        if self.queue.withdraw(conn) {
            tracing::debug!(%conn, "left matchmaking queue");
        }
        let code = self.registry.room_of(conn)?;
        let room = self.registry.remove(&code)?;
        if let Some(opponent) = room.opponent_of(conn) {
            opponent.send(ServerMessage::PlayerLeft);
        }
        tracing::info!(%code, %conn, phase = %room.phase(), "room closed by disconnect");
        Some(code)
    }
}
