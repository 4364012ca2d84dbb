//! Randomness for the survival roll.
//!
//! RULE: the reducer never reaches for a platform RNG itself.
//! It draws from an injected `RandomSource`, so tests can substitute
//! a seeded stream or a fixed draw.

use crate::snapshot::SafeSettings;
use rand::{rngs::OsRng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub trait RandomSource {
    /// A uniform draw in [0.0, 1.0).
    fn next_f64(&mut self) -> f64;
}

/// Map 64 random bits onto [0.0, 1.0) using the top 53 bits.
fn unit_f64(bits: u64) -> f64 {
    (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Production source: operating-system entropy, unpredictable.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntropyRng;

impl RandomSource for EntropyRng {
    fn next_f64(&mut self) -> f64 {
        unit_f64(OsRng.next_u64())
    }
}

/// Reproducible source for tests and replays.
pub struct SeededRng {
    inner: Pcg64Mcg,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }
}

impl RandomSource for SeededRng {
    fn next_f64(&mut self) -> f64 {
        unit_f64(self.inner.next_u64())
    }
}

/// Always returns the same draw. Forces an outcome in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedRoll(pub f64);

impl RandomSource for FixedRoll {
    fn next_f64(&mut self) -> f64 {
        self.0
    }
}

/// One Bernoulli trial: survives iff `draw < chance / 100`.
/// Never draws when survival is disabled.
pub fn survival_roll(settings: &SafeSettings, rng: &mut dyn RandomSource) -> bool {
    if !settings.survival_enabled {
        return false;
    }
    let p = f64::from(settings.effective_survival_chance()) / 100.0;
    rng.next_f64() < p
}
