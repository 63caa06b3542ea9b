//! Deterministic random number generation.
//!
//! Nothing in the simulation may call a platform RNG. Every execution that
//! needs randomness owns a [`PseudoRandom`] seeded from stable identifiers
//! (game seed, player id, tile, unit id) so a replay makes the same
//! decisions in the same order.

use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::math::Fixed;

/// Seeded PRNG owned by a single execution.
#[derive(Debug, Clone)]
pub struct PseudoRandom {
    inner: Pcg64Mcg,
}

impl PseudoRandom {
    /// Create a generator from a raw seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Create a generator from a list of stable identifiers.
    ///
    /// Order matters: `[a, b]` and `[b, a]` produce different streams.
    #[must_use]
    pub fn from_parts(parts: &[u64]) -> Self {
        Self::new(mix_seed(parts))
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Uniform integer in `[min, max)`. Returns `min` when the range is empty.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max.abs_diff(min);
        min + (self.inner.next_u64() % span) as i64
    }

    /// Uniform index in `[0, len)`. Returns 0 for an empty range.
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.inner.next_u64() % len as u64) as usize
    }

    /// Uniform fixed-point value in `[0, 1)`.
    pub fn next_fixed(&mut self) -> Fixed {
        // 32 random fractional bits
        Fixed::from_bits((self.inner.next_u64() >> 32) as i64)
    }

    /// Returns true with probability `1 / odds`. `odds <= 1` is always true.
    pub fn chance(&mut self, odds: u32) -> bool {
        if odds <= 1 {
            return true;
        }
        self.inner.next_u64() % u64::from(odds) == 0
    }

    /// Returns true with probability `percent / 100`.
    pub fn percent(&mut self, percent: u32) -> bool {
        (self.inner.next_u64() % 100) < u64::from(percent)
    }

    /// Pick a random element.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.next_index(items.len()))
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}

/// Stable 64-bit FNV-1a hash of a string.
///
/// Used to turn names and ids into seeds. Unlike `DefaultHasher` the result
/// never changes between Rust releases.
#[must_use]
pub fn simple_hash(value: &str) -> u64 {
    value.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Fold several identifiers into one seed.
#[must_use]
pub fn mix_seed(parts: &[u64]) -> u64 {
    parts.iter().fold(0x9e37_79b9_7f4a_7c15, |acc, part| {
        (acc ^ part.wrapping_mul(0x9e37_79b9_7f4a_7c15)).rotate_left(27)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = PseudoRandom::new(42);
        let mut b = PseudoRandom::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_different_parts_order_differs() {
        let mut a = PseudoRandom::from_parts(&[1, 2]);
        let mut b = PseudoRandom::from_parts(&[2, 1]);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_next_int_bounds() {
        let mut rng = PseudoRandom::new(7);
        for _ in 0..1000 {
            let v = rng.next_int(-5, 5);
            assert!((-5..5).contains(&v));
        }
        assert_eq!(rng.next_int(3, 3), 3);
    }

    #[test]
    fn test_next_fixed_is_unit_interval() {
        let mut rng = PseudoRandom::new(9);
        for _ in 0..1000 {
            let v = rng.next_fixed();
            assert!(v >= Fixed::ZERO && v < Fixed::ONE);
        }
    }

    #[test]
    fn test_chance_degenerate_odds() {
        let mut rng = PseudoRandom::new(1);
        assert!(rng.chance(0));
        assert!(rng.chance(1));
    }

    #[test]
    fn test_simple_hash_is_stable() {
        assert_eq!(simple_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(simple_hash("nation"), simple_hash("nation"));
        assert_ne!(simple_hash("a"), simple_hash("b"));
    }

    #[test]
    fn test_choose_empty() {
        let mut rng = PseudoRandom::new(3);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
    }
}
