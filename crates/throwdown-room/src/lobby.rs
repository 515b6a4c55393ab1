//! The shared, async front door to the arena.

use std::sync::{Arc, Weak};

use throwdown_protocol::{Move, RoomCode};
use throwdown_timer::TimerSet;
use throwdown_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::{
    Arena, CodeGenerator, MatchConfig, MoveOutcome, Participant, RandomCodeGenerator, RoomError,
    RoomSnapshot,
};

struct LobbyState {
    arena: Arena,
    timers: TimerSet<RoomCode>,
}

/// Serializes every game operation behind one lock.
///
/// Cheap to clone; every connection task holds a clone. Each method locks,
/// runs the matching [`Arena`] operation to completion, and unlocks. Round
/// resolution runs on a timer task that takes the same lock, so a
/// disconnect that cancels the timer while holding the lock is final.
#[derive(Clone)]
pub struct Lobby {
    inner: Arc<Mutex<LobbyState>>,
}

impl Lobby {
    /// Creates a lobby with OS-seeded room codes.
    pub fn new(config: MatchConfig) -> Self {
        Self::with_code_generator(config, Box::new(RandomCodeGenerator::new()))
    }

    /// Creates a lobby that draws room codes from `codes`.
    pub fn with_code_generator(config: MatchConfig, codes: Box<dyn CodeGenerator>) -> Self {
        let arena = Arena::new(config.validated(), codes);
        Self {
            inner: Arc::new(Mutex::new(LobbyState {
                arena,
                timers: TimerSet::new(),
            })),
        }
    }

    pub async fn find_stranger(&self, player: Participant) {
        self.inner.lock().await.arena.find_stranger(player);
    }

    pub async fn create_room(&self, player: Participant) -> Result<RoomCode, RoomError> {
        self.inner.lock().await.arena.create_room(player)
    }

    pub async fn join_room(&self, player: Participant, code: &RoomCode) -> Result<(), RoomError> {
        self.inner.lock().await.arena.join_room(player, code)
    }

    /// Records a move. When it completes the round, schedules the
    /// resolution after the configured reveal delay.
    pub async fn submit_move(&self, conn: ConnectionId, hand: Move) -> MoveOutcome {
        let mut state = self.inner.lock().await;
        let outcome = state.arena.submit_move(conn, hand);

        if let MoveOutcome::RoundReady { code, serial } = &outcome {
            let delay = state.arena.config().reveal_delay;
            let lobby = Arc::downgrade(&self.inner);
            let key = code.clone();
            let serial = *serial;
            state.timers.schedule(code.clone(), delay, async move {
                Self::resolve_round(lobby, key, serial).await;
            });
        }
        outcome
    }

    /// Drops every trace of `conn` and cancels its room's pending round.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut state = self.inner.lock().await;
        if let Some(code) = state.arena.disconnect(conn) {
            if let Some(left) = state.timers.remaining(&code) {
                tracing::debug!(%code, remaining_ms = left.as_millis() as u64, "dropping pending round");
            }
            state.timers.cancel(&code);
        }
    }

    /// Cancels every pending round resolution. Returns how many there were.
    pub async fn shutdown(&self) -> usize {
        let cancelled = self.inner.lock().await.timers.cancel_all();
        tracing::info!(cancelled, "lobby shut down");
        cancelled
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.inner.lock().await.arena.registry().len()
    }

    /// The connection waiting for a stranger, if any.
    pub async fn waiting(&self) -> Option<ConnectionId> {
        self.inner.lock().await.arena.queue().waiting()
    }

    /// Number of rounds waiting out their reveal delay.
    pub async fn pending_resolutions(&self) -> usize {
        self.inner.lock().await.timers.len()
    }

    /// The room `conn` sits in, if any.
    pub async fn room_of(&self, conn: ConnectionId) -> Option<RoomCode> {
        self.inner.lock().await.arena.registry().room_of(conn)
    }

    pub async fn snapshot(&self, code: &RoomCode) -> Option<RoomSnapshot> {
        let state = self.inner.lock().await;
        state.arena.registry().get(code).map(|room| room.snapshot())
    }

    async fn resolve_round(lobby: Weak<Mutex<LobbyState>>, code: RoomCode, serial: u64) {
        let Some(inner) = lobby.upgrade() else {
            return;
        };
        let mut state = inner.lock().await;
        state.timers.complete(&code);
        state.arena.resolve_round(&code, serial);
    }
}

impl std::fmt::Debug for Lobby {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lobby").finish_non_exhaustive()
    }
}
