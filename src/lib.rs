#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # Peakbench
//!
//! Micro-benchmarks for competing maximum-subarray implementations, with
//! the peak process memory of each case measured concurrently.
//!
//! The harness opens one [`peakbench_monitor::MemoryMonitor`] window per
//! case around the timed iterations. The window's statistics are published as
//! `MaxProcPhysMem`/`MaxProcVirtMem` counters, plus `MinProcPhysMem` and
//! `AvgProcPhysMem` when full statistics are enabled.
//!
//! Saved JSON reports can be fed back to [`history::analyze_dir`] to spot
//! step changes across runs.

pub mod adapter;
pub mod cli;
pub mod config;
pub mod counters;
pub mod error;
pub mod history;
pub mod report;

pub use adapter::{CaseReport, TimingSummary, run_case, run_suite};
pub use config::BenchConfig;
pub use counters::{Counters, MemoryUnit, publish};
pub use error::{HarnessError, Result};
pub use history::{HistoryConfig, HistoryMetric, HistoryReport, Verdict, analyze_dir, render_history};
pub use report::{OutputFormat, render};

// Re-export workspace crates
pub use peakbench_monitor;
pub use peakbench_subarray;
