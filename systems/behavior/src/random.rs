//! Seeded random source used for wander-target selection.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::RandomSource;

/// ChaCha8-backed [`RandomSource`]; identical seeds replay identical draws.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Creates a source seeded from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }
}
