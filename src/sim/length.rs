use anyhow::{bail, Result};
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Attempts before a draw gives up on rejection sampling and clamps.
const MAX_REJECTIONS: u32 = 1000;

/// Truncated normal model for read and fragment lengths. A zero standard
/// deviation degenerates to a fixed length equal to the mean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthModel {
    pub mean: usize,
    pub std_dev: usize,
    pub min: usize,
    pub max: usize,
}

impl LengthModel {
    pub fn fixed(len: usize) -> Self {
        LengthModel {
            mean: len,
            std_dev: 0,
            min: len,
            max: len,
        }
    }

    /// The smallest length this model can actually produce, which is what
    /// region geometry has to be checked against up front.
    pub fn effective_min(&self) -> usize {
        if self.std_dev == 0 {
            self.mean
        } else {
            self.min
        }
    }

    pub fn validate(&self, what: &str) -> Result<()> {
        if self.mean == 0 {
            bail!("{what} length mean must be positive");
        }
        if self.min > self.max {
            bail!(
                "{what} length minimum {} exceeds maximum {}",
                self.min,
                self.max
            );
        }
        if self.std_dev > 0 && (self.mean < self.min || self.mean > self.max) {
            warn!(
                "{what} length mean {} lies outside [{}, {}]; draws will clamp \
                 to the nearest bound after {MAX_REJECTIONS} rejected attempts",
                self.mean, self.min, self.max
            );
        }
        Ok(())
    }

    /// Draws a length via Box-Muller, rejecting values outside the bounds.
    /// When the bounds are unreachable in a reasonable number of attempts
    /// the draw clamps instead of spinning forever.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        if self.std_dev == 0 {
            return self.mean;
        }
        for _ in 0..MAX_REJECTIONS {
            let u1 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
            let u2 = rng.gen::<f64>();
            let normal = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
            let length = self.mean as i64 + (normal * self.std_dev as f64) as i64;
            if length >= self.min as i64 && length <= self.max as i64 {
                return length as usize;
            }
        }
        debug!(
            "length draw exhausted {MAX_REJECTIONS} attempts, clamping mean {} into [{}, {}]",
            self.mean, self.min, self.max
        );
        self.mean.clamp(self.min, self.max)
    }
}
