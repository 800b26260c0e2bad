//! Peakbench Monitor - concurrent peak-memory sampling for benchmark windows
//!
//! A [`MemoryMonitor`] brackets a timed workload. `start()` spawns one
//! background thread that polls a [`MemoryProbe`] at a short, bounded cadence
//! and folds every snapshot into a constant-space [`SampleAggregator`].
//! `stop()` joins that thread and hands back the window's
//! [`MemoryStatistics`].
//!
//! # Guarantees
//!
//! - A failing probe never reaches the workload: the last good snapshot (or
//!   zero) is substituted.
//! - `stop()` blocks until the sampler has taken one final sample after the
//!   stop request, so no data point of the window is lost.
//! - The aggregator is owned by the sampler thread and moved back on join;
//!   the caller never sees intermediate statistics.
//!
//! # Example
//!
//! ```rust
//! use peakbench_monitor::{MemoryMonitor, MonitorConfig, SystemProbe};
//!
//! let mut monitor = MemoryMonitor::new(SystemProbe::new(), MonitorConfig::default());
//!
//! let (sum, stats) = monitor.measure(|| (0..1_000_u64).sum::<u64>());
//! assert_eq!(sum, 499_500);
//!
//! if let Ok(stats) = stats {
//!     assert!(stats.sample_count() >= 1);
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod aggregator;
mod config;
mod error;
mod monitor;
mod probe;
mod snapshot;

pub use aggregator::{MemoryStatistics, SampleAggregator, StatisticsMode};
pub use config::{DEFAULT_SAMPLING_INTERVAL, MonitorConfig};
pub use error::{MonitorError, ProbeError, Result};
pub use monitor::{MemoryMonitor, MonitorState, RunningWindow};
#[cfg(target_os = "linux")]
pub use probe::{ProcStatus, parse_proc_status};
pub use probe::{FailSoftProbe, MemoryProbe, SystemProbe};
pub use snapshot::{Capability, MemorySnapshot, ProbeCapabilities};
