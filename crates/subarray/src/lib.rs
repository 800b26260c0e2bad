//! Peakbench Subarray - maximum-subarray workloads
//!
//! Two classic solutions to the maximum-subarray problem, benchmarked
//! against each other:
//!
//! - [`max_subarray_greedy`]: every start index, O(n²)
//! - [`max_subarray_divide_conquer`]: left/right/crossing recursion, O(n log n)
//!
//! Inputs come from [`random_values`], seeded for reproducible runs.
//!
//! # Example
//!
//! ```rust
//! use peakbench_subarray::{Algorithm, max_subarray_greedy};
//!
//! let values = [-2, 1, -3, 4, -1, 2, 1, -5, 4];
//! let best = max_subarray_greedy(&values);
//! assert_eq!(best.map(|b| (b.sum, b.start, b.end)), Some((6, 3, 6)));
//!
//! let same = Algorithm::DivideConquer.run(&values);
//! assert_eq!(same.map(|b| b.sum), Some(6));
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod data;
mod divide_conquer;
mod error;
mod greedy;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use data::{ValueRange, random_values};
pub use divide_conquer::max_subarray_divide_conquer;
pub use error::SubarrayError;
pub use greedy::max_subarray_greedy;

/// A contiguous range `start..=end` and its sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subarray {
    pub sum: i64,
    pub start: usize,
    pub end: usize,
}

impl Subarray {
    /// Number of elements in the range.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// A subarray always holds at least one element.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// The competing implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    Greedy,
    DivideConquer,
}

impl Algorithm {
    pub const ALL: [Self; 2] = [Self::Greedy, Self::DivideConquer];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::DivideConquer => "divide-conquer",
        }
    }

    #[must_use]
    pub fn run(self, values: &[i64]) -> Option<Subarray> {
        match self {
            Self::Greedy => max_subarray_greedy(values),
            Self::DivideConquer => max_subarray_divide_conquer(values),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = SubarrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == s)
            .ok_or_else(|| SubarrayError::UnknownAlgorithm {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.name().parse::<Algorithm>(), Ok(algorithm));
        }
    }

    #[test]
    fn test_unknown_algorithm() {
        assert_eq!(
            "kadane".parse::<Algorithm>(),
            Err(SubarrayError::UnknownAlgorithm {
                name: "kadane".to_string()
            })
        );
    }

    #[test]
    fn test_subarray_len() {
        let range = Subarray {
            sum: 0,
            start: 2,
            end: 4,
        };
        assert_eq!(range.len(), 3);
    }
}
