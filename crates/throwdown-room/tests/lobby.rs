//! Integration tests for the lobby: matchmaking, rooms and timed rounds.
//!
//! Runs with a paused Tokio clock so the one-second reveal delay costs no
//! real time. Awaiting a message lets the runtime jump straight to the next
//! timer deadline.

use std::time::Duration;

use throwdown_protocol::Move::{Paper, Rock, Scissors};
use throwdown_protocol::{Move, PlayerSlot, RoomCode, ServerMessage, Winner};
use throwdown_room::{Lobby, MatchConfig, MoveOutcome, Participant, RandomCodeGenerator, RoomPhase};
use throwdown_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::time::Instant;

const REVEAL: Duration = Duration::from_secs(1);

// =========================================================================
// Helpers
// =========================================================================

struct Client {
    participant: Participant,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Client {
    fn new(id: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            participant: Participant::new(ConnectionId::new(id), tx),
            rx,
        }
    }

    fn id(&self) -> ConnectionId {
        self.participant.id()
    }

    fn me(&self) -> Participant {
        self.participant.clone()
    }

    /// Next message, waiting (in paused time) as long as needed.
    async fn recv(&mut self) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(30), self.rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("outbox closed")
    }

    /// Everything already queued, without waiting.
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

fn lobby() -> Lobby {
    Lobby::with_code_generator(MatchConfig::default(), Box::new(RandomCodeGenerator::seeded(1)))
}

async fn match_strangers(lobby: &Lobby, a: &mut Client, b: &mut Client) -> RoomCode {
    lobby.find_stranger(a.me()).await;
    lobby.find_stranger(b.me()).await;
    a.drain();
    b.drain();
    lobby.room_of(a.id()).await.expect("strangers should share a room")
}

/// Both players move, then both wait for the round result and round end.
async fn play_round(lobby: &Lobby, a: &mut Client, b: &mut Client, ma: Move, mb: Move) {
    lobby.submit_move(a.id(), ma).await;
    lobby.submit_move(b.id(), mb).await;
    for client in [&mut *a, &mut *b] {
        assert!(matches!(client.recv().await, ServerMessage::RoundResult { .. }));
        assert!(matches!(client.recv().await, ServerMessage::RoundEnd { .. }));
    }
}

// =========================================================================
// Full match
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stranger_match_to_game_over() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);

    lobby.find_stranger(a.me()).await;
    assert_eq!(a.recv().await, ServerMessage::WaitingForPlayer);

    lobby.find_stranger(b.me()).await;
    let code = lobby.room_of(a.id()).await.unwrap();
    assert_eq!(
        a.recv().await,
        ServerMessage::MatchFound {
            room_id: code.clone(),
            player: PlayerSlot::P1
        }
    );
    assert_eq!(
        b.recv().await,
        ServerMessage::MatchFound {
            room_id: code.clone(),
            player: PlayerSlot::P2
        }
    );

    for round in 1..=3 {
        lobby.submit_move(a.id(), Rock).await;
        lobby.submit_move(b.id(), Scissors).await;

        assert_eq!(
            a.recv().await,
            ServerMessage::RoundResult {
                winner: Winner::P1,
                own_move: Rock,
                opponent_move: Scissors
            }
        );
        assert_eq!(a.recv().await, ServerMessage::RoundEnd { round });
        assert_eq!(
            b.recv().await,
            ServerMessage::RoundResult {
                winner: Winner::P1,
                own_move: Scissors,
                opponent_move: Rock
            }
        );
        assert_eq!(b.recv().await, ServerMessage::RoundEnd { round });
    }

    let over = ServerMessage::GameOver { winner: Winner::P1 };
    assert_eq!(a.recv().await, over);
    assert_eq!(b.recv().await, over);
    assert_eq!(lobby.room_count().await, 0);
    assert_eq!(lobby.room_of(a.id()).await, None);
    assert_eq!(lobby.pending_resolutions().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_drawn_match() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    match_strangers(&lobby, &mut a, &mut b).await;

    play_round(&lobby, &mut a, &mut b, Paper, Rock).await;
    play_round(&lobby, &mut a, &mut b, Paper, Scissors).await;
    play_round(&lobby, &mut a, &mut b, Rock, Rock).await;

    let over = ServerMessage::GameOver {
        winner: Winner::Draw,
    };
    assert_eq!(a.recv().await, over);
    assert_eq!(b.recv().await, over);
}

#[tokio::test(start_paused = true)]
async fn test_scores_track_decisive_rounds_only() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    let code = match_strangers(&lobby, &mut a, &mut b).await;

    play_round(&lobby, &mut a, &mut b, Rock, Rock).await;
    play_round(&lobby, &mut a, &mut b, Rock, Paper).await;

    let snap = lobby.snapshot(&code).await.unwrap();
    assert_eq!(snap.scores, [0, 1]);
    assert_eq!(snap.rounds_completed, 2);
    assert_eq!(snap.moved, [false, false]);
    assert_eq!(snap.phase, RoomPhase::AwaitingMoves);
}

// =========================================================================
// Reveal delay
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_result_waits_for_reveal_delay() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    let code = match_strangers(&lobby, &mut a, &mut b).await;

    lobby.submit_move(a.id(), Paper).await;
    let start = Instant::now();
    let outcome = lobby.submit_move(b.id(), Rock).await;
    assert!(matches!(outcome, MoveOutcome::RoundReady { .. }));
    assert_eq!(lobby.pending_resolutions().await, 1);
    assert_eq!(
        lobby.snapshot(&code).await.unwrap().phase,
        RoomPhase::Resolving
    );

    tokio::time::sleep(REVEAL - Duration::from_millis(1)).await;
    assert!(a.drain().is_empty(), "result sent before the reveal delay");

    assert!(matches!(a.recv().await, ServerMessage::RoundResult { .. }));
    assert!(start.elapsed() >= REVEAL);
    assert_eq!(lobby.pending_resolutions().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_moves_during_reveal_are_ignored() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    match_strangers(&lobby, &mut a, &mut b).await;

    lobby.submit_move(a.id(), Rock).await;
    lobby.submit_move(b.id(), Paper).await;
    assert_eq!(
        lobby.submit_move(a.id(), Scissors).await,
        MoveOutcome::Ignored
    );

    assert_eq!(
        a.recv().await,
        ServerMessage::RoundResult {
            winner: Winner::P2,
            own_move: Rock,
            opponent_move: Paper
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_reveal_delay() {
    let config = MatchConfig {
        reveal_delay: Duration::from_millis(250),
        ..MatchConfig::default()
    };
    let lobby = Lobby::with_code_generator(config, Box::new(RandomCodeGenerator::seeded(3)));
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    match_strangers(&lobby, &mut a, &mut b).await;

    lobby.submit_move(a.id(), Rock).await;
    let start = Instant::now();
    lobby.submit_move(b.id(), Rock).await;
    a.recv().await;
    assert!(start.elapsed() >= Duration::from_millis(250));
    assert!(start.elapsed() < REVEAL);
}

// =========================================================================
// Explicit rooms
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_room_code_flow() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);

    let code = lobby.create_room(a.me()).await.unwrap();
    assert_eq!(code.as_str().len(), 6);
    assert_eq!(
        a.recv().await,
        ServerMessage::RoomCreated {
            room_id: code.clone(),
            player: PlayerSlot::P1
        }
    );

    lobby.join_room(b.me(), &code).await.unwrap();
    assert!(matches!(a.recv().await, ServerMessage::MatchFound { player: PlayerSlot::P1, .. }));
    assert_eq!(a.recv().await, ServerMessage::RoundStart { round: 1 });
    assert!(matches!(b.recv().await, ServerMessage::MatchFound { player: PlayerSlot::P2, .. }));
    assert_eq!(b.recv().await, ServerMessage::RoundStart { round: 1 });

    play_round(&lobby, &mut a, &mut b, Scissors, Paper).await;
    assert_eq!(lobby.snapshot(&code).await.unwrap().scores, [1, 0]);
}

#[tokio::test(start_paused = true)]
async fn test_join_invalid_rooms() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    let mut c = Client::new(3);

    assert!(lobby.join_room(c.me(), &"NOPE00".into()).await.is_err());
    assert_eq!(c.recv().await, ServerMessage::RoomInvalid);

    let code = lobby.create_room(a.me()).await.unwrap();
    lobby.join_room(b.me(), &code).await.unwrap();
    a.drain();
    b.drain();

    assert!(lobby.join_room(c.me(), &code).await.is_err());
    assert_eq!(c.recv().await, ServerMessage::RoomInvalid);
    assert!(a.drain().is_empty());
    assert!(b.drain().is_empty());
    assert_eq!(lobby.room_count().await, 1);
}

// =========================================================================
// Disconnects
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_disconnect_mid_match() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    match_strangers(&lobby, &mut a, &mut b).await;
    play_round(&lobby, &mut a, &mut b, Rock, Paper).await;

    lobby.disconnect(b.id()).await;
    assert_eq!(a.recv().await, ServerMessage::PlayerLeft);
    assert_eq!(lobby.room_count().await, 0);

    // A second disconnect for the same room changes nothing.
    lobby.disconnect(a.id()).await;
    tokio::time::sleep(REVEAL).await;
    assert!(a.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_resolution() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    match_strangers(&lobby, &mut a, &mut b).await;

    lobby.submit_move(a.id(), Rock).await;
    lobby.submit_move(b.id(), Scissors).await;
    assert_eq!(lobby.pending_resolutions().await, 1);

    lobby.disconnect(a.id()).await;
    assert_eq!(lobby.pending_resolutions().await, 0);

    tokio::time::sleep(REVEAL * 3).await;
    assert_eq!(b.drain(), vec![ServerMessage::PlayerLeft]);
}

#[tokio::test(start_paused = true)]
async fn test_waiting_disconnect_clears_queue() {
    let lobby = lobby();
    let a = Client::new(1);
    let mut b = Client::new(2);

    lobby.find_stranger(a.me()).await;
    assert_eq!(lobby.waiting().await, Some(a.id()));
    lobby.disconnect(a.id()).await;
    assert_eq!(lobby.waiting().await, None);

    lobby.find_stranger(b.me()).await;
    assert_eq!(b.recv().await, ServerMessage::WaitingForPlayer);
    assert_eq!(lobby.room_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_creator_leaves_before_anyone_joins() {
    let lobby = lobby();
    let a = Client::new(1);
    let mut b = Client::new(2);
    let code = lobby.create_room(a.me()).await.unwrap();

    lobby.disconnect(a.id()).await;
    assert!(lobby.join_room(b.me(), &code).await.is_err());
    assert_eq!(b.recv().await, ServerMessage::RoomInvalid);
}

// =========================================================================
// Isolation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_rooms_are_isolated() {
    let lobby = lobby();
    let mut a = Client::new(1);
    let mut b = Client::new(2);
    let mut c = Client::new(3);
    let mut d = Client::new(4);
    let first = match_strangers(&lobby, &mut a, &mut b).await;
    let second = match_strangers(&lobby, &mut c, &mut d).await;
    assert_ne!(first, second);

    lobby.submit_move(a.id(), Rock).await;
    lobby.submit_move(c.id(), Paper).await;
    lobby.submit_move(b.id(), Scissors).await;

    assert!(matches!(a.recv().await, ServerMessage::RoundResult { .. }));
    assert!(c.drain().is_empty());
    assert!(d.drain().is_empty());
    let other = lobby.snapshot(&second).await.unwrap();
    assert_eq!(other.moved, [true, false]);
    assert_eq!(other.rounds_completed, 0);

    lobby.disconnect(b.id()).await;
    assert_eq!(lobby.room_count().await, 1);
    assert!(lobby.snapshot(&second).await.is_some());
}
