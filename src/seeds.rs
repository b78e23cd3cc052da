//! Seed streams for map generation.
//!
//! Every stage draws from its own stream derived from the master seed, so a
//! change to how one stage consumes randomness never reshuffles the others.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Per-stage seed streams, derived deterministically from one master seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapSeeds {
    /// Master seed (kept for display/reference).
    pub master: u64,
    /// Noise primitive instancing (one offset per biome layer).
    pub terrain: u64,
    /// Per-run 2D noise-space salt.
    pub salt: u64,
    /// Per-cell dispersion draws (mixed with the cell index).
    pub dispersion: u64,
    /// Sequential settlement placement.
    pub settlements: u64,
}

impl MapSeeds {
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            terrain: derive_seed(master, "terrain"),
            salt: derive_seed(master, "salt"),
            dispersion: derive_seed(master, "dispersion"),
            settlements: derive_seed(master, "settlements"),
        }
    }
}

/// Derive a sub-seed from the master seed and a stream name.
/// Hashing keeps the streams distinct but deterministic.
fn derive_seed(master: u64, stream: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    stream.hash(&mut hasher);
    hasher.finish()
}
