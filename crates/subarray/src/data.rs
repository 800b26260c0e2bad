//! Seeded benchmark input.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SubarrayError;

/// Inclusive, non-empty range of generated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct ValueRange {
    min: i64,
    max: i64,
}

impl ValueRange {
    /// # Errors
    ///
    /// Returns [`SubarrayError::EmptyRange`] if `min > max`.
    pub const fn new(min: i64, max: i64) -> Result<Self, SubarrayError> {
        if min > max {
            Err(SubarrayError::EmptyRange { min, max })
        } else {
            Ok(Self { min, max })
        }
    }

    #[must_use]
    pub const fn min(&self) -> i64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> i64 {
        self.max
    }

    /// Whether every sum of up to `len` values from this range fits in an
    /// `i64`. Both algorithms require this to report exact sums.
    #[must_use]
    pub const fn sums_fit(&self, len: usize) -> bool {
        let magnitude = if self.min.unsigned_abs() > self.max.unsigned_abs() {
            self.min.unsigned_abs()
        } else {
            self.max.unsigned_abs()
        };
        match (magnitude as u128).checked_mul(len as u128) {
            Some(bound) => bound <= i64::MAX as u128,
            None => false,
        }
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self {
            min: -1000,
            max: 1000,
        }
    }
}

impl TryFrom<(i64, i64)> for ValueRange {
    type Error = SubarrayError;

    fn try_from((min, max): (i64, i64)) -> Result<Self, Self::Error> {
        Self::new(min, max)
    }
}

impl From<ValueRange> for (i64, i64) {
    fn from(range: ValueRange) -> Self {
        (range.min, range.max)
    }
}

/// `len` values drawn uniformly from `range`. Same seed, same values.
#[must_use]
pub fn random_values(len: usize, seed: u64, range: ValueRange) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| rng.gen_range(range.min..=range.max))
        .collect()
}
