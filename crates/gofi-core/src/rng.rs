//! Deterministic per-rollout RNG.
//!
//! # Determinism strategy
//!
//! Each MCTS rollout gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (frame * MIXING_CONSTANT) XOR ((index + 1) * STREAM_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive frames and rollout indices uniformly across the
//! seed space.  This means:
//!
//! - Rollouts never share RNG state, so they can run on any worker thread in
//!   any order and still draw identical numbers.
//! - Two planning calls at different frames explore differently, while the
//!   same (seed, frame, index) triple always reproduces the same rollout.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::Frame;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Second odd constant so frame and index streams do not cancel.
const STREAM_CONSTANT: u64 = 0xbf58_476d_1ce4_e5b9;

// ── RolloutRng ────────────────────────────────────────────────────────────────

/// Per-rollout deterministic RNG.
///
/// The type is `Send` but deliberately not shared: each rollout owns its own
/// instance for the duration of the default-policy simulation.
pub struct RolloutRng(SmallRng);

impl RolloutRng {
    /// Seed deterministically from the run's global seed, the frame of the
    /// planning call and the simulation index within that call.
    pub fn new(global_seed: u64, frame: Frame, index: u32) -> Self {
        let seed = global_seed
            ^ frame.0.wrapping_mul(MIXING_CONSTANT)
            ^ (index as u64 + 1).wrapping_mul(STREAM_CONSTANT);
        RolloutRng(SmallRng::seed_from_u64(seed))
    }

    /// Sample a uniformly distributed value of any `Standard`-distributed type.
    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }
}
