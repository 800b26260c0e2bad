//! Configuration for benchmark runs
//!
//! Loaded from an optional TOML file, then overridden from the command line.
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! data_len = 100
//! seed = 42
//! value_range = [-1000, 1000]
//! iterations = 100
//! warmup_iterations = 5
//! pause_per_iteration_ms = 0
//! unit = "mib"
//! algorithms = ["greedy", "divide-conquer"]
//!
//! [monitor]
//! sampling_interval_us = 500
//! statistics = "full"
//! ```

use std::path::Path;
use std::time::Duration;

use peakbench_monitor::MonitorConfig;
use peakbench_subarray::{Algorithm, ValueRange};
use serde::{Deserialize, Serialize};

use crate::counters::MemoryUnit;
use crate::error::{HarnessError, Result};

/// Largest input; the greedy case is quadratic.
const MAX_DATA_LEN: usize = 100_000;

/// Upper bound on timed iterations per case
const MAX_ITERATIONS: u32 = 1_000_000;

/// Upper bound on the artificial per-iteration pause
const MAX_PAUSE_MS: u64 = 10_000;

/// Benchmark run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Number of input values
    pub data_len: usize,

    /// Seed for input generation
    pub seed: u64,

    /// Inclusive range of input values
    pub value_range: ValueRange,

    /// Timed iterations per case
    pub iterations: u32,

    /// Untimed iterations before the monitoring window opens
    pub warmup_iterations: u32,

    /// Sleep inside each timed iteration, in milliseconds (0 = none)
    pub pause_per_iteration_ms: u64,

    /// Unit for published memory counters
    pub unit: MemoryUnit,

    /// Cases to run, in order
    pub algorithms: Vec<Algorithm>,

    /// Memory monitor settings
    pub monitor: MonitorConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            data_len: 100,
            seed: 42,
            value_range: ValueRange::default(),
            iterations: 100,
            warmup_iterations: 5,
            pause_per_iteration_ms: 0,
            unit: MemoryUnit::default(),
            algorithms: Algorithm::ALL.to_vec(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Load and validate a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, does not parse, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| HarnessError::ConfigReadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let config: Self = toml::from_str(&content).map_err(|e| HarnessError::ConfigParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// The per-iteration pause, if any.
    #[must_use]
    pub const fn pause_per_iteration(&self) -> Option<Duration> {
        if self.pause_per_iteration_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.pause_per_iteration_ms))
        }
    }

    /// Check limits that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.data_len == 0 || self.data_len > MAX_DATA_LEN {
            return Err(HarnessError::invalid_config(format!(
                "data_len must be between 1 and {MAX_DATA_LEN}, got {}",
                self.data_len
            )));
        }
        if self.iterations == 0 || self.iterations > MAX_ITERATIONS {
            return Err(HarnessError::invalid_config(format!(
                "iterations must be between 1 and {MAX_ITERATIONS}, got {}",
                self.iterations
            )));
        }
        if !self.value_range.sums_fit(self.data_len) {
            return Err(HarnessError::invalid_config(format!(
                "value_range [{}, {}] is too wide for {} values: sums would overflow i64",
                self.value_range.min(),
                self.value_range.max(),
                self.data_len
            )));
        }
        if self.pause_per_iteration_ms > MAX_PAUSE_MS {
            return Err(HarnessError::invalid_config(format!(
                "pause_per_iteration_ms must be at most {MAX_PAUSE_MS}, got {}",
                self.pause_per_iteration_ms
            )));
        }
        if self.algorithms.is_empty() {
            return Err(HarnessError::invalid_config(
                "at least one algorithm must be selected",
            ));
        }
        Ok(())
    }
}
