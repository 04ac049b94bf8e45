//! Seeded random streams.
//!
//! All randomness of a run flows from a single seed. When none is configured
//! one is drawn from the OS and logged, so any run can be regenerated.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use tracing::info;

/// Generator stream used by both workloads.
pub type FixtureRng = Pcg64Mcg;

/// Pick the seed for this run.
pub fn resolve_seed(configured: Option<u64>) -> u64 {
    let seed = configured.unwrap_or_else(rand::random);
    info!(seed, explicit = configured.is_some(), "using seed");
    seed
}

pub fn from_seed(seed: u64) -> FixtureRng {
    Pcg64Mcg::seed_from_u64(seed)
}
