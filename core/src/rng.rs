//! Deterministic random number generation.
//!
//! RULE: Nothing in the pipeline may call any platform RNG.
//! The jitter applied during feature derivation flows through a single
//! JitterRng seeded from the run seed, so a run is fully reproducible
//! given the same seed and raw-count snapshot.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// The seedable random source for one pipeline run.
pub struct JitterRng {
    inner: Pcg64Mcg,
}

impl JitterRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a float uniformly in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        debug_assert!(lo < hi, "uniform() needs lo < hi");
        lo + (hi - lo) * self.next_f64()
    }
}
