//! Deterministic default content.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Generates default buffer content from a seeded stream.
#[derive(Clone, Debug)]
pub(crate) struct ContentSource {
    rng: ChaCha8Rng,
    cap: usize,
}

impl ContentSource {
    pub(crate) fn new(seed: u64, cap: usize) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            cap,
        }
    }

    /// `len` bytes: random up to the cap, zero after it.
    pub(crate) fn generate(&mut self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        let random = len.min(self.cap);
        self.rng.fill_bytes(&mut bytes[..random]);
        bytes
    }
}
