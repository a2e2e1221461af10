// crates/jobs/src/estimator.rs
//! Locally simulated progress, shown until the backend reports real numbers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EstimatorConfig;

/// A monotonic, capped progress curve.
///
/// Each [`tick`](Self::tick) adds a random step drawn from the configured
/// range. For bulk jobs the step is divided across the expected item count,
/// so larger imports creep forward more slowly.
#[derive(Debug, Clone)]
pub struct OptimisticEstimator {
    config: EstimatorConfig,
    item_count: Option<usize>,
    value: f64,
    ticks: u64,
    rng: StdRng,
}

impl OptimisticEstimator {
    pub fn new(config: EstimatorConfig, item_count: Option<usize>) -> Self {
        Self::with_rng(config, item_count, StdRng::from_entropy())
    }

    pub fn with_rng(config: EstimatorConfig, item_count: Option<usize>, rng: StdRng) -> Self {
        Self {
            config,
            item_count,
            value: 0.0,
            ticks: 0,
            rng,
        }
    }

    /// Advance one tick and return the new estimate.
    pub fn tick(&mut self) -> f64 {
        self.ticks += 1;
        let step = self.next_step();
        self.value = (self.value + step).min(self.config.ceiling).max(self.value);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn ceiling(&self) -> f64 {
        self.config.ceiling
    }

    fn next_step(&mut self) -> f64 {
        let EstimatorConfig {
            min_step,
            max_step,
            fallback_step,
            ..
        } = self.config;
        match self.item_count {
            Some(0) => fallback_step,
            count => {
                let raw = if max_step > min_step {
                    self.rng.gen_range(min_step..=max_step)
                } else {
                    min_step
                };
                match count {
                    Some(n) => raw / n as f64,
                    None => raw,
                }
            }
        }
    }
}
