//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through PathRng instances derived
//! from the single master seed of the run.
//!
//! Each path gets its own RNG stream, seeded deterministically
//! from (master_seed XOR mixed path_index). This means:
//!   - A path's draws never depend on how many paths ran before it.
//!   - Any path can be replayed in isolation from (master_seed, index).
//!   - Parallel and sequential runs see identical streams.

use crate::types::PathIndex;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// A source of uniform variates in [0.0, 1.0).
/// The sampler only depends on this, so tests can feed it fixed sequences.
pub trait UniformSource {
    fn next_f64(&mut self) -> f64;
}

/// A deterministic RNG owned by a single path.
pub struct PathRng {
    pub path_index: PathIndex,
    seed: u64,
    inner: Pcg64Mcg,
}

impl PathRng {
    /// Create the stream for one path. The index is the path's position in
    /// the run and must be stable across sequential and parallel execution.
    pub fn for_path(master_seed: u64, path_index: PathIndex) -> Self {
        let seed = derive_path_seed(master_seed, path_index);
        Self {
            path_index,
            seed,
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// The derived per-path seed, logged with each outcome for replay.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }
}

impl UniformSource for PathRng {
    fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Mix a path index into the master seed.
pub fn derive_path_seed(master_seed: u64, path_index: PathIndex) -> u64 {
    master_seed ^ path_index.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA)
}

/// All path RNGs for a single run, keyed by the run's master seed.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Pick a master seed from OS entropy. Only the driver calls this, once
    /// per run, and it logs the seed so the run can be reproduced.
    pub fn from_entropy() -> Self {
        Self::new(rand::random::<u64>())
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_path(&self, path_index: PathIndex) -> PathRng {
        PathRng::for_path(self.master_seed, path_index)
    }
}
