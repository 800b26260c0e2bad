//! Constant-space running statistics over memory snapshots.

use serde::{Deserialize, Serialize};

use crate::snapshot::MemorySnapshot;

/// Which statistics the aggregator keeps beyond the maxima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatisticsMode {
    /// Maxima only.
    MaxOnly,
    /// Maxima, minima and means.
    #[default]
    Full,
}

impl StatisticsMode {
    const fn tracks_min_and_mean(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Accumulates snapshots for one monitoring window.
///
/// `finalize` consumes the aggregator, so it can be called once per window and
/// nothing can be observed afterwards.
#[derive(Debug, Clone)]
pub struct SampleAggregator {
    mode: StatisticsMode,
    count: u64,
    max_resident: u64,
    max_virtual: u64,
    min_resident: u64,
    min_virtual: u64,
    sum_resident: u128,
    sum_virtual: u128,
}

impl SampleAggregator {
    #[must_use]
    pub const fn new(mode: StatisticsMode) -> Self {
        Self {
            mode,
            count: 0,
            max_resident: 0,
            max_virtual: 0,
            min_resident: u64::MAX,
            min_virtual: u64::MAX,
            sum_resident: 0,
            sum_virtual: 0,
        }
    }

    /// Fold one snapshot into the running statistics.
    pub fn observe(&mut self, snapshot: MemorySnapshot) {
        let resident = snapshot.resident_bytes();
        let virtual_bytes = snapshot.virtual_bytes();

        self.count = self.count.saturating_add(1);
        self.max_resident = self.max_resident.max(resident);
        self.max_virtual = self.max_virtual.max(virtual_bytes);

        if self.mode.tracks_min_and_mean() {
            self.min_resident = self.min_resident.min(resident);
            self.min_virtual = self.min_virtual.min(virtual_bytes);
            self.sum_resident = self.sum_resident.saturating_add(u128::from(resident));
            self.sum_virtual = self.sum_virtual.saturating_add(u128::from(virtual_bytes));
        }
    }

    /// Samples observed so far.
    #[must_use]
    pub const fn sample_count(&self) -> u64 {
        self.count
    }

    /// Running resident maximum. Never decreases.
    #[must_use]
    pub const fn max_resident(&self) -> u64 {
        self.max_resident
    }

    /// Hand off the accumulated statistics.
    #[must_use]
    pub fn finalize(self) -> MemoryStatistics {
        let has_samples = self.count > 0;
        let full = self.mode.tracks_min_and_mean();

        let min = |value: u64| (full && has_samples).then_some(value);
        let mean = |sum: u128| full.then(|| mean_of(sum, self.count));

        MemoryStatistics {
            mode: self.mode,
            sample_count: self.count,
            max_resident: self.max_resident,
            max_virtual: self.max_virtual,
            min_resident: min(self.min_resident),
            min_virtual: min(self.min_virtual),
            mean_resident: mean(self.sum_resident),
            mean_virtual: mean(self.sum_virtual),
        }
    }
}

impl Default for SampleAggregator {
    fn default() -> Self {
        Self::new(StatisticsMode::default())
    }
}

#[allow(clippy::cast_precision_loss)] // Means are reported as floating point
fn mean_of(sum: u128, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Final statistics of one monitoring window, in bytes.
///
/// With zero samples the maxima are 0 and the minima are `None`. Means are
/// `Some(0.0)` in [`StatisticsMode::Full`]. Minima and means are always `None`
/// in [`StatisticsMode::MaxOnly`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatistics {
    mode: StatisticsMode,
    sample_count: u64,
    max_resident: u64,
    max_virtual: u64,
    min_resident: Option<u64>,
    min_virtual: Option<u64>,
    mean_resident: Option<f64>,
    mean_virtual: Option<f64>,
}

impl MemoryStatistics {
    #[must_use]
    pub const fn mode(&self) -> StatisticsMode {
        self.mode
    }

    #[must_use]
    pub const fn sample_count(&self) -> u64 {
        self.sample_count
    }

    #[must_use]
    pub const fn max_resident(&self) -> u64 {
        self.max_resident
    }

    #[must_use]
    pub const fn max_virtual(&self) -> u64 {
        self.max_virtual
    }

    #[must_use]
    pub const fn min_resident(&self) -> Option<u64> {
        self.min_resident
    }

    #[must_use]
    pub const fn min_virtual(&self) -> Option<u64> {
        self.min_virtual
    }

    #[must_use]
    pub const fn mean_resident(&self) -> Option<f64> {
        self.mean_resident
    }

    #[must_use]
    pub const fn mean_virtual(&self) -> Option<f64> {
        self.mean_virtual
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]

    use super::*;

    fn observe_all(mode: StatisticsMode, samples: &[(u64, u64)]) -> MemoryStatistics {
        let mut aggregator = SampleAggregator::new(mode);
        for &(resident, virtual_bytes) in samples {
            aggregator.observe(MemorySnapshot::new(resident, virtual_bytes));
        }
        aggregator.finalize()
    }

    #[test]
    fn test_three_sample_scenario() {
        let stats = observe_all(StatisticsMode::Full, &[(100, 10), (300, 5), (200, 50)]);

        assert_eq!(stats.sample_count(), 3);
        assert_eq!(stats.max_resident(), 300);
        assert_eq!(stats.max_virtual(), 50);
        assert_eq!(stats.min_resident(), Some(100));
        assert_eq!(stats.min_virtual(), Some(5));
        assert_eq!(stats.mean_resident(), Some(200.0));
    }

    #[test]
    fn test_zero_samples_use_sentinels() {
        let stats = SampleAggregator::new(StatisticsMode::Full).finalize();

        assert_eq!(stats.sample_count(), 0);
        assert_eq!(stats.max_resident(), 0);
        assert_eq!(stats.max_virtual(), 0);
        assert_eq!(stats.min_resident(), None);
        assert_eq!(stats.min_virtual(), None);
        assert_eq!(stats.mean_resident(), Some(0.0));
        assert_eq!(stats.mean_virtual(), Some(0.0));
    }

    #[test]
    fn test_max_only_mode_skips_min_and_mean() {
        let stats = observe_all(StatisticsMode::MaxOnly, &[(100, 10), (300, 5)]);

        assert_eq!(stats.mode(), StatisticsMode::MaxOnly);
        assert_eq!(stats.max_resident(), 300);
        assert_eq!(stats.max_virtual(), 10);
        assert_eq!(stats.min_resident(), None);
        assert_eq!(stats.mean_resident(), None);
    }

    #[test]
    fn test_running_max_is_monotonic() {
        let mut aggregator = SampleAggregator::default();
        let mut previous = 0;
        for resident in [5, 3, 9, 1, 9, 12, 0] {
            aggregator.observe(MemorySnapshot::new(resident, 0));
            assert!(aggregator.max_resident() >= previous);
            previous = aggregator.max_resident();
        }
        assert_eq!(previous, 12);
    }

    #[test]
    fn test_mean_does_not_overflow() {
        let stats = observe_all(StatisticsMode::Full, &[(u64::MAX, 0), (u64::MAX, 0)]);
        let mean = stats.mean_resident().unwrap();
        assert!((mean - u64::MAX as f64).abs() < 1.0e6);
    }
}
