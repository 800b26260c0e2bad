//! Step-change detection across saved benchmark reports.
//!
//! Every `--format json` run writes an array of [`CaseReport`]s. Pointing
//! `peakbench analyze` at a directory of such files builds one series per
//! case name (oldest run first) for a chosen metric. Each series is checked
//! for a recent step:
//!
//! 1. smooth the series with a Hann window to flatten one-off spikes
//! 2. compare the last `sliding_window` points against the older ones with a
//!    Mann-Whitney U test
//! 3. confirm a rejection with Welch's t-test, which the U test alone can
//!    trigger on a change in spread
//! 4. locate the step and tell a regression (values went up) from an
//!    improvement
//!
//! Files that do not parse are skipped with a warning.

mod stats;

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapter::CaseReport;
use crate::error::{HarnessError, Result};
use crate::report::OutputFormat;

pub use stats::{estimate_step, hann_smooth, mann_whitney_p, welch_p};

/// Runs that must precede the sliding window before a series is analysed.
pub const MIN_BASELINE_RUNS: usize = 10;

/// Default number of recent runs compared against the baseline.
pub const DEFAULT_SLIDING_WINDOW: usize = 6;

/// Default Hann window length.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 9;

/// Default significance level for both tests.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Which figure of a case report forms the series.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HistoryMetric {
    /// Mean iteration time in nanoseconds
    #[default]
    MeanTime,
    /// Fastest iteration in nanoseconds
    MinTime,
    /// Slowest iteration in nanoseconds
    MaxTime,
    /// A published memory counter such as `MaxProcPhysMem`
    Counter(String),
}

impl HistoryMetric {
    /// The metric's value in `report`, if the report carries it.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Nanosecond figures are reported as floating point
    pub fn extract(&self, report: &CaseReport) -> Option<f64> {
        let timing = report.timing();
        match self {
            Self::MeanTime => Some(timing.mean_ns()),
            Self::MinTime => Some(timing.min().as_nanos() as f64),
            Self::MaxTime => Some(timing.max().as_nanos() as f64),
            Self::Counter(name) => report.counters().get(name),
        }
    }
}

impl FromStr for HistoryMetric {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Err(HarnessError::invalid_config("metric name is empty")),
            "mean_ns" => Ok(Self::MeanTime),
            "min_ns" => Ok(Self::MinTime),
            "max_ns" => Ok(Self::MaxTime),
            counter => Ok(Self::Counter(counter.to_string())),
        }
    }
}

impl fmt::Display for HistoryMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeanTime => f.write_str("mean_ns"),
            Self::MinTime => f.write_str("min_ns"),
            Self::MaxTime => f.write_str("max_ns"),
            Self::Counter(name) => f.write_str(name),
        }
    }
}

/// Settings for one history analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    /// Recent runs compared against the rest
    pub sliding_window: usize,

    /// Keep only the newest N runs (0 = all)
    pub max_samples: usize,

    /// Drop the newest N runs before analysing
    pub discard: usize,

    /// Hann window length (below 3 disables smoothing)
    pub smoothing_window: usize,

    /// Significance level for both tests
    pub alpha: f64,

    /// Figure to track
    pub metric: HistoryMetric,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            sliding_window: DEFAULT_SLIDING_WINDOW,
            max_samples: 0,
            discard: 0,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            alpha: DEFAULT_ALPHA,
            metric: HistoryMetric::default(),
        }
    }
}

impl HistoryConfig {
    /// Runs a series needs before it is analysed.
    #[must_use]
    pub const fn required_runs(&self) -> usize {
        MIN_BASELINE_RUNS + self.sliding_window
    }

    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidConfig`] if the window is shorter than
    /// two runs or alpha is outside (0, 1).
    pub fn validate(&self) -> Result<()> {
        if self.sliding_window < 2 {
            return Err(HarnessError::invalid_config(format!(
                "sliding_window must be at least 2, got {}",
                self.sliding_window
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(HarnessError::invalid_config(format!(
                "alpha must be between 0 and 1, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Outcome of analysing one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum Verdict {
    /// Too few runs to split into baseline and window.
    InsufficientData { required: usize },

    /// The window matches the baseline.
    Stable { mann_whitney_p: f64 },

    /// The U test rejected but Welch's test did not confirm.
    Unconfirmed { mann_whitney_p: f64, welch_p: f64 },

    /// Both tests rejected but no step could be located.
    Unlocated { mann_whitney_p: f64, welch_p: f64 },

    /// Values stepped up `runs_ago` runs back.
    Regression {
        mann_whitney_p: f64,
        welch_p: f64,
        step_index: usize,
        runs_ago: usize,
    },

    /// Values stepped down `runs_ago` runs back.
    Improvement {
        mann_whitney_p: f64,
        welch_p: f64,
        step_index: usize,
        runs_ago: usize,
    },
}

impl Verdict {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient-data",
            Self::Stable { .. } => "stable",
            Self::Unconfirmed { .. } => "unconfirmed",
            Self::Unlocated { .. } => "unlocated",
            Self::Regression { .. } => "regression",
            Self::Improvement { .. } => "improvement",
        }
    }

    #[must_use]
    pub const fn is_regression(&self) -> bool {
        matches!(self, Self::Regression { .. })
    }
}

/// Analyse one series, oldest value first.
#[must_use]
pub fn analyze_series(values: &[f64], config: &HistoryConfig) -> Verdict {
    let runs = values.len();
    let required = config.required_runs();
    if runs < required {
        return Verdict::InsufficientData { required };
    }

    let smoothed = hann_smooth(values, config.smoothing_window);
    let (baseline, window) = smoothed.split_at(runs - config.sliding_window);

    let mann_whitney_p = mann_whitney_p(baseline, window);
    if mann_whitney_p >= config.alpha {
        return Verdict::Stable { mann_whitney_p };
    }

    let welch_p = welch_p(baseline, window);
    if welch_p >= config.alpha || welch_p.is_nan() {
        return Verdict::Unconfirmed {
            mann_whitney_p,
            welch_p,
        };
    }

    match estimate_step(&smoothed) {
        Some(step_index) if step_index > 0 && step_index + 1 < runs => {
            let runs_ago = runs - step_index;
            if smoothed[step_index + 1] > smoothed[step_index - 1] {
                Verdict::Regression {
                    mann_whitney_p,
                    welch_p,
                    step_index,
                    runs_ago,
                }
            } else {
                Verdict::Improvement {
                    mann_whitney_p,
                    welch_p,
                    step_index,
                    runs_ago,
                }
            }
        }
        _ => Verdict::Unlocated {
            mann_whitney_p,
            welch_p,
        },
    }
}

/// One saved run: the reports of a single `--format json` output.
#[derive(Debug, Clone)]
pub struct SavedRun {
    pub path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub reports: Vec<CaseReport>,
}

/// Saved runs found in a directory, oldest first.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub runs: Vec<SavedRun>,
    pub skipped: Vec<PathBuf>,
}

impl History {
    /// Read every `*.json` file in `dir`.
    ///
    /// Runs are ordered by their earliest case start time, then by path.
    /// Files that cannot be read or parsed, or that hold no reports, are
    /// listed in `skipped`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::HistoryReadFailed`] if the directory cannot be
    /// listed.
    pub fn load(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| HarnessError::HistoryReadFailed {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut history = Self::default();
        for path in paths {
            match read_run(&path) {
                Ok(Some(run)) => {
                    debug!(path = %path.display(), cases = run.reports.len(), "loaded saved run");
                    history.runs.push(run);
                }
                Ok(None) => {
                    warn!(path = %path.display(), "saved run holds no reports, skipping");
                    history.skipped.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), "corrupt saved run, skipping: {e}");
                    history.skipped.push(path);
                }
            }
        }

        history
            .runs
            .sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.path.cmp(&b.path)));
        Ok(history)
    }

    /// Drop the newest `discard` runs, then keep at most `max_samples` (0 = all).
    pub fn restrict(&mut self, discard: usize, max_samples: usize) {
        let keep = self.runs.len().saturating_sub(discard);
        self.runs.truncate(keep);
        if max_samples > 0 && self.runs.len() > max_samples {
            self.runs.drain(..self.runs.len() - max_samples);
        }
    }

    /// One series per case name, oldest value first. Reports missing the
    /// metric contribute nothing.
    #[must_use]
    pub fn series(&self, metric: &HistoryMetric) -> BTreeMap<String, Vec<f64>> {
        let mut series: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for run in &self.runs {
            for report in &run.reports {
                if let Some(value) = metric.extract(report) {
                    series.entry(report.name().to_string()).or_default().push(value);
                }
            }
        }
        series
    }
}

fn read_run(path: &Path) -> Result<Option<SavedRun>> {
    let content = std::fs::read_to_string(path).map_err(|e| HarnessError::HistoryReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let reports: Vec<CaseReport> =
        serde_json::from_str(&content).map_err(|e| HarnessError::HistoryParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(reports
        .iter()
        .map(|report| *report.started_at())
        .min()
        .map(|started_at| SavedRun {
            path: path.to_path_buf(),
            started_at,
            reports,
        }))
}

/// Verdict for one case name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseTrend {
    pub name: String,
    pub runs: usize,
    #[serde(flatten)]
    pub verdict: Verdict,
}

/// Result of analysing a directory of saved runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub metric: String,
    pub runs_analyzed: usize,
    pub files_skipped: usize,
    pub cases: Vec<CaseTrend>,
}

impl HistoryReport {
    /// Whether any case regressed.
    #[must_use]
    pub fn has_regression(&self) -> bool {
        self.cases.iter().any(|case| case.verdict.is_regression())
    }
}

/// Load `dir`, apply the run limits and analyse every case.
///
/// # Errors
///
/// Returns error if the configuration is invalid or the directory cannot be
/// listed.
pub fn analyze_dir(dir: &Path, config: &HistoryConfig) -> Result<HistoryReport> {
    config.validate()?;

    let mut history = History::load(dir)?;
    history.restrict(config.discard, config.max_samples);
    info!(
        runs = history.runs.len(),
        skipped = history.skipped.len(),
        metric = %config.metric,
        "analysing benchmark history"
    );

    let cases = history
        .series(&config.metric)
        .into_iter()
        .map(|(name, values)| {
            let verdict = analyze_series(&values, config);
            match &verdict {
                Verdict::Regression { runs_ago, .. } => {
                    warn!(case = %name, runs_ago, "step change in {} (regression)", config.metric);
                }
                Verdict::InsufficientData { required } => {
                    debug!(case = %name, runs = values.len(), required, "not enough runs");
                }
                other => debug!(case = %name, verdict = other.label(), "analysed"),
            }
            CaseTrend {
                name,
                runs: values.len(),
                verdict,
            }
        })
        .collect();

    Ok(HistoryReport {
        metric: config.metric.to_string(),
        runs_analyzed: history.runs.len(),
        files_skipped: history.skipped.len(),
        cases,
    })
}

/// Render a history report in `format`.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_history(report: &HistoryReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_history_table(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

fn render_history_table(report: &HistoryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "metric: {}  runs: {}  skipped files: {}",
        report.metric, report.runs_analyzed, report.files_skipped
    );
    let _ = writeln!(
        out,
        "{:<16} {:>6} {:<18} {:>10} {:>10} {:>9}",
        "Benchmark", "Runs", "Verdict", "U p", "Welch p", "Runs ago"
    );

    for case in &report.cases {
        let (mw, welch, ago) = match &case.verdict {
            Verdict::InsufficientData { .. } => (None, None, None),
            Verdict::Stable { mann_whitney_p } => (Some(*mann_whitney_p), None, None),
            Verdict::Unconfirmed {
                mann_whitney_p,
                welch_p,
            }
            | Verdict::Unlocated {
                mann_whitney_p,
                welch_p,
            } => (Some(*mann_whitney_p), Some(*welch_p), None),
            Verdict::Regression {
                mann_whitney_p,
                welch_p,
                runs_ago,
                ..
            }
            | Verdict::Improvement {
                mann_whitney_p,
                welch_p,
                runs_ago,
                ..
            } => (Some(*mann_whitney_p), Some(*welch_p), Some(*runs_ago)),
        };

        let p = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        let _ = writeln!(
            out,
            "{:<16} {:>6} {:<18} {:>10} {:>10} {:>9}",
            case.name,
            case.runs,
            case.verdict.label(),
            p(mw),
            p(welch),
            ago.map_or_else(|| "-".to_string(), |v| v.to_string()),
        );
    }

    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn stepped(baseline: usize, window: usize, before: f64, after: f64) -> Vec<f64> {
        (0..baseline)
            .map(|i| before + (i % 3) as f64)
            .chain((0..window).map(|i| after + (i % 3) as f64))
            .collect()
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("mean_ns".parse::<HistoryMetric>().unwrap(), HistoryMetric::MeanTime);
        assert_eq!("max_ns".parse::<HistoryMetric>().unwrap(), HistoryMetric::MaxTime);
        assert_eq!(
            "MaxProcPhysMem".parse::<HistoryMetric>().unwrap(),
            HistoryMetric::Counter("MaxProcPhysMem".to_string())
        );
        assert!("".parse::<HistoryMetric>().is_err());
        assert_eq!(HistoryMetric::MinTime.to_string(), "min_ns");
    }

    #[test]
    fn test_config_validation() {
        assert!(HistoryConfig::default().validate().is_ok());

        let narrow = HistoryConfig {
            sliding_window: 1,
            ..HistoryConfig::default()
        };
        assert!(narrow.validate().is_err());

        let bad_alpha = HistoryConfig {
            alpha: 1.5,
            ..HistoryConfig::default()
        };
        assert!(bad_alpha.validate().is_err());
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let config = HistoryConfig::default();
        assert_eq!(
            analyze_series(&[1.0; 15], &config),
            Verdict::InsufficientData { required: 16 }
        );
    }

    #[test]
    fn test_flat_series_is_stable() {
        let verdict = analyze_series(&[250.0; 30], &HistoryConfig::default());
        assert!(matches!(verdict, Verdict::Stable { .. }), "{verdict:?}");
    }

    #[test]
    fn test_upward_step_is_regression() {
        let values = stepped(20, 6, 100.0, 150.0);
        let verdict = analyze_series(&values, &HistoryConfig::default());

        let Verdict::Regression { runs_ago, .. } = verdict else {
            panic!("expected regression, got {verdict:?}");
        };
        assert!((5..=9).contains(&runs_ago), "runs_ago = {runs_ago}");
    }

    #[test]
    fn test_downward_step_is_improvement() {
        let values = stepped(20, 6, 150.0, 100.0);
        let verdict = analyze_series(&values, &HistoryConfig::default());
        assert!(matches!(verdict, Verdict::Improvement { .. }), "{verdict:?}");
    }

    #[test]
    fn test_restrict_discards_then_limits() {
        let run = |secs: i64| SavedRun {
            path: PathBuf::from(format!("{secs}.json")),
            started_at: DateTime::from_timestamp(secs, 0).unwrap(),
            reports: vec![],
        };
        let mut history = History {
            runs: (0..10).map(run).collect(),
            skipped: vec![],
        };

        history.restrict(2, 5);

        let kept: Vec<i64> = history.runs.iter().map(|r| r.started_at.timestamp()).collect();
        assert_eq!(kept, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_history_table_lists_cases() {
        let report = HistoryReport {
            metric: "mean_ns".to_string(),
            runs_analyzed: 3,
            files_skipped: 1,
            cases: vec![CaseTrend {
                name: "greedy".to_string(),
                runs: 3,
                verdict: Verdict::InsufficientData { required: 16 },
            }],
        };

        let table = render_history(&report, OutputFormat::Table).unwrap();
        assert!(table.starts_with("metric: mean_ns"));
        assert!(table.contains("greedy"));
        assert!(table.contains("insufficient-data"));
    }
}
