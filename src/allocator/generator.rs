use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use std::sync::Mutex;

/// Length of every generated short id
pub const SHORT_ID_LENGTH: usize = 11;

/// Characters a short id is drawn from
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of candidate short ids
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform random ids over [`ALPHABET`].
///
/// The generator is not cryptographically strong; uniqueness comes from the
/// allocator's conflict-detecting insert, not from the entropy of one draw.
pub struct RandomIdGenerator {
    rng: Mutex<StdRng>,
    length: usize,
}

impl RandomIdGenerator {
    /// Seed once from the wall clock
    pub fn from_clock() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::from_seed(seed)
    }

    /// Deterministic generator, mostly for tests
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            length: SHORT_ID_LENGTH,
        }
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        // rng state stays valid even if a previous holder panicked
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
