//! Reproducible synthetic values for demonstration maps.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::error::{ChoroplethError, Result};

/// Uniform random values drawn from an explicitly seeded generator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyntheticValues {
    pub seed: u64,
    pub min: f64,
    pub max: f64,
    /// Draw whole numbers in `[min, max)` instead of reals.
    #[serde(default)]
    pub integer: bool,
}

impl SyntheticValues {
    pub fn generate(&self, count: usize) -> Result<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.generate_with(&mut rng, count)
    }

    /// Draw from a caller-owned generator.
    pub fn generate_with<R: Rng>(&self, rng: &mut R, count: usize) -> Result<Vec<f64>> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min >= self.max {
            return Err(ChoroplethError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }

        if self.integer {
            let lo = self.min.ceil() as i64;
            let hi = self.max.ceil() as i64;
            if lo >= hi {
                return Err(ChoroplethError::InvalidRange {
                    min: self.min,
                    max: self.max,
                });
            }
            Ok((0..count).map(|_| rng.gen_range(lo..hi) as f64).collect())
        } else {
            Ok((0..count).map(|_| rng.gen_range(self.min..self.max)).collect())
        }
    }
}
