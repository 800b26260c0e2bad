//! CLI definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use peakbench_monitor::{MonitorConfig, StatisticsMode};
use peakbench_subarray::Algorithm;

use crate::config::BenchConfig;
use crate::counters::MemoryUnit;
use crate::error::Result;
use crate::history::{
    DEFAULT_ALPHA, DEFAULT_SLIDING_WINDOW, DEFAULT_SMOOTHING_WINDOW, HistoryConfig, HistoryMetric,
};
use crate::report::OutputFormat;

/// Peakbench - maximum-subarray benchmarks with peak memory counters
#[derive(Parser, Debug)]
#[command(name = "peakbench")]
#[command(version)]
#[command(about = "Times maximum-subarray implementations and measures peak process memory")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Algorithm to run (repeatable): greedy, divide-conquer
    #[arg(short, long = "algorithm", value_name = "NAME")]
    pub algorithms: Vec<Algorithm>,

    /// Timed iterations per case
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Untimed warmup iterations per case
    #[arg(long)]
    pub warmup: Option<u32>,

    /// Number of input values
    #[arg(long)]
    pub data_len: Option<usize>,

    /// Seed for input generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Sleep inside each timed iteration
    #[arg(long, value_name = "MS")]
    pub pause_ms: Option<u64>,

    /// Pause between memory samples
    #[arg(long, value_name = "MICROS")]
    pub interval_us: Option<u64>,

    /// Statistics to collect
    #[arg(long, value_enum)]
    pub statistics: Option<StatisticsArg>,

    /// Unit for memory counters
    #[arg(long, value_enum)]
    pub unit: Option<MemoryUnit>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look for step changes across saved `--format json` reports
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory holding one JSON report per run
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Recent runs compared against the older ones
    #[arg(short = 'w', long, default_value_t = DEFAULT_SLIDING_WINDOW)]
    pub sliding_window: usize,

    /// Analyse only the newest N runs (0 = all)
    #[arg(short = 'm', long, default_value_t = 0)]
    pub max_samples: usize,

    /// Ignore the newest N runs
    #[arg(long, default_value_t = 0)]
    pub discard: usize,

    /// Hann smoothing window (below 3 disables smoothing)
    #[arg(long, default_value_t = DEFAULT_SMOOTHING_WINDOW)]
    pub smoothing_window: usize,

    /// Significance level
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,

    /// mean_ns, min_ns, max_ns or a counter name such as MaxProcPhysMem
    #[arg(long, default_value = "mean_ns")]
    pub metric: HistoryMetric,

    /// Exit with an error when any case regressed
    #[arg(long)]
    pub fail_on_regression: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl AnalyzeArgs {
    #[must_use]
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            sliding_window: self.sliding_window,
            max_samples: self.max_samples,
            discard: self.discard,
            smoothing_window: self.smoothing_window,
            alpha: self.alpha,
            metric: self.metric.clone(),
        }
    }
}

/// Command-line spelling of [`StatisticsMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatisticsArg {
    MaxOnly,
    Full,
}

impl From<StatisticsArg> for StatisticsMode {
    fn from(arg: StatisticsArg) -> Self {
        match arg {
            StatisticsArg::MaxOnly => Self::MaxOnly,
            StatisticsArg::Full => Self::Full,
        }
    }
}

impl Cli {
    /// Load the config file (or defaults) and apply command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be loaded or the merged configuration
    /// is invalid.
    pub fn resolve_config(&self) -> Result<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };

        if !self.algorithms.is_empty() {
            config.algorithms.clone_from(&self.algorithms);
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(warmup) = self.warmup {
            config.warmup_iterations = warmup;
        }
        if let Some(data_len) = self.data_len {
            config.data_len = data_len;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(pause_ms) = self.pause_ms {
            config.pause_per_iteration_ms = pause_ms;
        }
        if let Some(unit) = self.unit {
            config.unit = unit;
        }
        if self.interval_us.is_some() || self.statistics.is_some() {
            let interval = self
                .interval_us
                .map_or(config.monitor.sampling_interval(), Duration::from_micros);
            let statistics = self
                .statistics
                .map_or(config.monitor.statistics(), StatisticsMode::from);
            config.monitor = MonitorConfig::new(interval, statistics)?
                .with_thread_name(config.monitor.thread_name())?;
        }

        config.validate()?;
        Ok(config)
    }
}
