use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Seed used for the train/test split when no seed is configured
pub const DEFAULT_SPLIT_SEED: u64 = 0;

/// Seeding policy of a run.
///
/// Random generators are derived from this configuration and passed explicitly
/// to the components which need randomness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SeedConfig {
    seed: Option<u64>,
}

impl SeedConfig {
    /// Constructor, `None` falls back to [DEFAULT_SPLIT_SEED]
    pub fn new(seed: Option<u64>) -> Self {
        SeedConfig { seed }
    }

    /// Configured seed if any
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Random generator used to split a dataset, deterministic even without seed
    pub fn split_rng(&self) -> Xoshiro256Plus {
        Xoshiro256Plus::seed_from_u64(self.seed.unwrap_or(DEFAULT_SPLIT_SEED))
    }
}
