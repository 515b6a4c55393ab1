//! Who wins a round, and who wins a match.

use std::cmp::Ordering;

use throwdown_protocol::{Move, Winner};

/// Judges one round. Equal moves draw; otherwise the seat whose move beats
/// the other's wins.
pub fn judge(p1: Move, p2: Move) -> Winner {
    if p1 == p2 {
        Winner::Draw
    } else if p1.beats(p2) {
        Winner::P1
    } else {
        Winner::P2
    }
}

/// Judges a finished match from its `[p1, p2]` scores.
pub fn match_winner(scores: [u32; 2]) -> Winner {
    match scores[0].cmp(&scores[1]) {
        Ordering::Greater => Winner::P1,
        Ordering::Less => Winner::P2,
        Ordering::Equal => Winner::Draw,
    }
}
