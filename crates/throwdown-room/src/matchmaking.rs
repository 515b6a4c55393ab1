//! Stranger matchmaking: a single waiting slot.

use throwdown_transport::ConnectionId;

use crate::Participant;

/// What happened when a participant asked for a stranger.
#[derive(Debug)]
pub enum Offer {
    /// Nobody was waiting; the participant now is.
    Waiting,
    /// The same connection was already the one waiting.
    AlreadyWaiting,
    /// Someone else was waiting; both have left the queue.
    Paired {
        waiting: Participant,
        newcomer: Participant,
    },
}

/// Holds at most one participant waiting for a stranger.
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    waiting: Option<Participant>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `participant`, or pairs them with whoever is waiting.
    pub fn offer(&mut self, participant: Participant) -> Offer {
        match self.waiting.take() {
            None => {
                self.waiting = Some(participant);
                Offer::Waiting
            }
            Some(current) if current.id() == participant.id() => {
                self.waiting = Some(current);
                Offer::AlreadyWaiting
            }
            Some(waiting) => Offer::Paired {
                waiting,
                newcomer: participant,
            },
        }
    }

    /// Clears the slot if `conn` holds it. Returns whether it did.
    pub fn withdraw(&mut self, conn: ConnectionId) -> bool {
        if self.waiting() == Some(conn) {
            self.waiting = None;
            true
        } else {
            false
        }
    }

    /// The connection currently waiting, if any.
    pub fn waiting(&self) -> Option<ConnectionId> {
        self.waiting.as_ref().map(Participant::id)
    }
}
