//! Seeded RNG streams and seed forking
//!
//! Every generation attempt owns one `TrackRng`, created from a seed derived
//! by `fork_seed`. Nothing here touches global state, so attempt `i` of
//! variant `v` of seed `s` replays identically on every run and platform.

use rand::RngCore;
use rand_pcg::Pcg32;

/// PCG stream selector shared by all track streams
const PCG_STREAM: u64 = 0x0a02_bdbf_7bb3_c0a7;
/// Spreads small integer seeds across the 64-bit PCG state
const SEED_SPREAD: u64 = 0x9e37_79b9_7f4a_7c15;
const SEED_XOR: u64 = 0xd1b5_4a32_d192_ed03;

/// A deterministic 32-bit RNG stream (PCG32: 64-bit state + 64-bit increment)
#[derive(Debug, Clone)]
pub struct TrackRng {
    inner: Pcg32,
}

impl TrackRng {
    pub fn new(seed: i32) -> Self {
        let state = (seed as u32 as u64).wrapping_mul(SEED_SPREAD) ^ SEED_XOR;
        Self {
            inner: Pcg32::new(state, PCG_STREAM),
        }
    }

    /// Uniform unsigned 32-bit draw
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    /// Unbiased integer in `[min, max)`
    ///
    /// Draws below `2^32 mod range` are rejected before reducing, so every
    /// value in the range is equally likely.
    ///
    /// # Panics
    /// If `max <= min`.
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        assert!(max > min, "next_int: empty range [{min}, {max})");
        let range = (max as i64 - min as i64) as u32;
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u32();
            if r >= threshold {
                return (min as i64 + (r % range) as i64) as i32;
            }
        }
    }

    /// Float in `[0, 1)` from the top 24 bits of one draw
    #[inline]
    pub fn next_float01(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
    }

    /// Pick an index with probability proportional to its weight
    ///
    /// # Panics
    /// If `weights` is empty or sums to zero.
    pub fn choose_weighted(&mut self, weights: &[f32]) -> usize {
        let total: f32 = weights.iter().sum();
        assert!(
            !weights.is_empty() && total > 0.0,
            "choose_weighted: no positive weights"
        );
        let mut roll = self.next_float01() * total;
        for (i, &w) in weights.iter().enumerate() {
            if roll < w {
                return i;
            }
            roll -= w;
        }
        // Float rounding can leave a sliver past the last band
        weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
    }
}

/// Derive a child seed from a root seed and three integers
///
/// Pure multiply-xor cascade (murmur3 finalizer per input), so the same
/// `(seed, a, b, c)` always yields the same child.
pub fn fork_seed(seed: i32, a: i32, b: i32, c: i32) -> i32 {
    let mut h = seed as u32;
    for v in [a, b, c] {
        h ^= (v as u32).wrapping_mul(0x9e37_79b1);
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
        h ^= h >> 16;
        h = h.wrapping_mul(0x85eb_ca6b);
        h ^= h >> 13;
        h = h.wrapping_mul(0xc2b2_ae35);
        h ^= h >> 16;
    }
    h as i32
}
