//! Room code generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use throwdown_protocol::RoomCode;

/// Characters a generated code is drawn from: uppercase base 36.
pub const ROOM_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces candidate room codes.
///
/// The registry checks each candidate against live rooms and asks again on
/// collision, so implementations need not track what they handed out.
pub trait CodeGenerator: Send + 'static {
    /// Returns a candidate code of `length` characters.
    fn generate(&mut self, length: usize) -> RoomCode;
}

impl<F> CodeGenerator for F
where
    F: FnMut(usize) -> RoomCode + Send + 'static,
{
    fn generate(&mut self, length: usize) -> RoomCode {
        self(length)
    }
}

/// Draws codes uniformly from [`ROOM_CODE_ALPHABET`].
pub struct RandomCodeGenerator {
    rng: StdRng,
}

impl RandomCodeGenerator {
    /// Seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sequence, for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&mut self, length: usize) -> RoomCode {
        let code: String = (0..length)
            .map(|_| {
                let index = self.rng.random_range(0..ROOM_CODE_ALPHABET.len());
                char::from(ROOM_CODE_ALPHABET[index])
            })
            .collect();
        RoomCode::new(code)
    }
}

impl std::fmt::Debug for RandomCodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomCodeGenerator").finish_non_exhaustive()
    }
}
