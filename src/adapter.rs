//! Timed benchmark cases bracketed by a memory monitoring window.
//!
//! Each case runs its warmup iterations and then opens one monitoring window
//! around all timed iterations. When the window closes, the statistics are
//! published as counters. A monitor that cannot start or stop never aborts the
//! case; the report simply carries no memory counters.

use std::hint::black_box;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use peakbench_monitor::{MemoryMonitor, MemoryProbe, MemoryStatistics};
use peakbench_subarray::{Subarray, random_values};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BenchConfig;
use crate::counters::{Counters, MemoryUnit, publish};

/// Wall-clock timing of the timed iterations, in nanoseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    iterations: u32,
    total_ns: u64,
    mean_ns: f64,
    min_ns: u64,
    max_ns: u64,
}

impl TimingSummary {
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    #[must_use]
    pub const fn total(&self) -> Duration {
        Duration::from_nanos(self.total_ns)
    }

    #[must_use]
    pub const fn mean_ns(&self) -> f64 {
        self.mean_ns
    }

    #[must_use]
    pub const fn min(&self) -> Duration {
        Duration::from_nanos(self.min_ns)
    }

    #[must_use]
    pub const fn max(&self) -> Duration {
        Duration::from_nanos(self.max_ns)
    }
}

/// Running min/max/total over iteration durations.
#[derive(Debug, Default)]
struct TimingAccumulator {
    iterations: u32,
    total_ns: u64,
    min_ns: Option<u64>,
    max_ns: u64,
}

impl TimingAccumulator {
    fn record(&mut self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.iterations = self.iterations.saturating_add(1);
        self.total_ns = self.total_ns.saturating_add(nanos);
        self.min_ns = Some(self.min_ns.map_or(nanos, |min| min.min(nanos)));
        self.max_ns = self.max_ns.max(nanos);
    }

    #[allow(clippy::cast_precision_loss)] // Means are reported as floating point
    fn summarize(self) -> TimingSummary {
        let mean_ns = if self.iterations == 0 {
            0.0
        } else {
            self.total_ns as f64 / f64::from(self.iterations)
        };
        TimingSummary {
            iterations: self.iterations,
            total_ns: self.total_ns,
            mean_ns,
            min_ns: self.min_ns.unwrap_or(0),
            max_ns: self.max_ns,
        }
    }
}

/// Outcome of one benchmark case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    name: String,
    started_at: DateTime<Utc>,
    timing: TimingSummary,
    result: Option<Subarray>,
    unit: MemoryUnit,
    memory: Option<MemoryStatistics>,
    counters: Counters,
}

impl CaseReport {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn started_at(&self) -> &DateTime<Utc> {
        &self.started_at
    }

    #[must_use]
    pub const fn timing(&self) -> &TimingSummary {
        &self.timing
    }

    /// Output of the last timed iteration.
    #[must_use]
    pub const fn result(&self) -> Option<Subarray> {
        self.result
    }

    #[must_use]
    pub const fn unit(&self) -> MemoryUnit {
        self.unit
    }

    /// Raw window statistics in bytes; `None` when the monitor was unavailable.
    #[must_use]
    pub const fn memory(&self) -> Option<&MemoryStatistics> {
        self.memory.as_ref()
    }

    #[must_use]
    pub const fn counters(&self) -> &Counters {
        &self.counters
    }
}

/// Run one case: warmup, then the timed iterations inside a monitoring window.
pub fn run_case<P, F>(
    name: &str,
    config: &BenchConfig,
    monitor: &mut MemoryMonitor<P>,
    mut workload: F,
) -> CaseReport
where
    P: MemoryProbe + 'static,
    F: FnMut() -> Option<Subarray>,
{
    info!(
        case = name,
        iterations = config.iterations,
        "running benchmark case"
    );

    for _ in 0..config.warmup_iterations {
        black_box(workload());
    }

    let capabilities = monitor.capabilities();
    let pause = config.pause_per_iteration();
    let started_at = Utc::now();

    let window = monitor
        .running()
        .inspect_err(|e| {
            warn!(case = name, "running without memory counters: {e}");
        })
        .ok();

    let mut timing = TimingAccumulator::default();
    let mut result = None;
    for _ in 0..config.iterations {
        let start = Instant::now();
        if let Some(pause) = pause {
            thread::sleep(pause);
        }
        result = black_box(workload());
        timing.record(start.elapsed());
    }

    let memory = window.and_then(|window| {
        window
            .finish()
            .inspect_err(|e| warn!(case = name, "memory statistics lost: {e}"))
            .ok()
    });

    let counters = memory
        .as_ref()
        .map(|stats| publish(stats, capabilities, config.unit))
        .unwrap_or_default();

    debug!(case = name, counters = counters.len(), "benchmark case finished");

    CaseReport {
        name: name.to_string(),
        started_at,
        timing: timing.summarize(),
        result,
        unit: config.unit,
        memory,
        counters,
    }
}

/// Run every configured algorithm on one seeded input, one window per case.
pub fn run_suite<P>(config: &BenchConfig, monitor: &mut MemoryMonitor<P>) -> Vec<CaseReport>
where
    P: MemoryProbe + 'static,
{
    let data = random_values(config.data_len, config.seed, config.value_range);
    debug!(len = data.len(), seed = config.seed, "generated benchmark input");

    config
        .algorithms
        .iter()
        .map(|&algorithm| {
            run_case(algorithm.name(), config, monitor, || {
                algorithm.run(black_box(&data))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_accumulator() {
        let mut timing = TimingAccumulator::default();
        timing.record(Duration::from_nanos(300));
        timing.record(Duration::from_nanos(100));
        timing.record(Duration::from_nanos(200));

        let summary = timing.summarize();
        assert_eq!(summary.iterations(), 3);
        assert_eq!(summary.total(), Duration::from_nanos(600));
        assert!((summary.mean_ns() - 200.0).abs() < f64::EPSILON);
        assert_eq!(summary.min(), Duration::from_nanos(100));
        assert_eq!(summary.max(), Duration::from_nanos(300));
    }

    #[test]
    fn test_empty_timing_summary() {
        let summary = TimingAccumulator::default().summarize();
        assert_eq!(summary.iterations(), 0);
        assert_eq!(summary.min(), Duration::ZERO);
        assert!(summary.mean_ns().abs() < f64::EPSILON);
    }
}
