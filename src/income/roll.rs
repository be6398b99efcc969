use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of base income values
pub trait IncomeRoll: Send {
    /// A value in `[min, max]`
    fn roll(&mut self, min: f64, max: f64) -> f64;
}

/// Uniform roll backed by any [`Rng`]
pub struct RandomRoll<R> {
    rng: R,
}

impl<R: Rng> RandomRoll<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomRoll<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible sequence for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> IncomeRoll for RandomRoll<R> {
    fn roll(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }
}

/// Always rolls the same value, clamped into the requested range
#[derive(Clone, Copy, Debug)]
pub struct FixedRoll(pub f64);

impl IncomeRoll for FixedRoll {
    fn roll(&mut self, min: f64, max: f64) -> f64 {
        self.0.clamp(min, max.max(min))
    }
}
