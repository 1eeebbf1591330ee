//! Seeded payload generators.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trim_core::shim::MARKER_BYTE;

/// Deterministic source of test payloads.
///
/// Generated bytes never contain the marker byte, so a payload only carries
/// a descriptor when a test puts one there.
pub struct PayloadGen {
    rng: StdRng,
}

impl PayloadGen {
    /// Creates a generator from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns `len` random bytes.
    pub fn bytes(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.byte()).collect()
    }

    fn byte(&mut self) -> u8 {
        loop {
            let b: u8 = self.rng.gen();
            if b != MARKER_BYTE {
                return b;
            }
        }
    }

    /// Returns a copy of `base` with `len` bytes at `at` replaced by fresh
    /// random bytes.
    pub fn mutate(&mut self, base: &[u8], at: usize, len: usize) -> Vec<u8> {
        let mut out = base.to_vec();
        for b in &mut out[at..at + len] {
            *b = self.byte();
        }
        out
    }

    /// Returns `len` bytes consisting of fresh data with `shared` copied in
    /// at `at`.
    pub fn embed(&mut self, len: usize, at: usize, shared: &[u8]) -> Vec<u8> {
        let mut out = self.bytes(len);
        out[at..at + shared.len()].copy_from_slice(shared);
        out
    }

    /// Returns a random length in `range`.
    pub fn len_in(&mut self, range: std::ops::RangeInclusive<usize>) -> usize {
        self.rng.gen_range(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_repeatable() {
        let a = PayloadGen::seeded(7).bytes(256);
        let b = PayloadGen::seeded(7).bytes(256);
        assert_eq!(a, b);
        assert!(!a.contains(&MARKER_BYTE));
    }

    #[test]
    fn test_embed_places_shared_bytes() {
        let mut gen = PayloadGen::seeded(1);
        let shared = gen.bytes(40);
        let out = gen.embed(100, 30, &shared);
        assert_eq!(&out[30..70], &shared[..]);
    }
}
