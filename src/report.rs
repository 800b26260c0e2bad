//! Rendering case reports for the terminal or as JSON.

use std::fmt::Write as _;

use clap::ValueEnum;

use crate::adapter::CaseReport;
use crate::counters::{AVG_PROC_PHYS_MEM, MAX_PROC_PHYS_MEM, MAX_PROC_VIRT_MEM, MIN_PROC_PHYS_MEM};
use crate::error::Result;

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Render reports in `format`.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render(reports: &[CaseReport], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(reports)),
        OutputFormat::Json => render_json(reports),
    }
}

/// Pretty-printed JSON array of reports.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn render_json(reports: &[CaseReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

const COUNTER_COLUMNS: [&str; 4] = [
    MAX_PROC_PHYS_MEM,
    MAX_PROC_VIRT_MEM,
    MIN_PROC_PHYS_MEM,
    AVG_PROC_PHYS_MEM,
];

/// Fixed-width table, one row per case. Missing counters print as `-`.
#[must_use]
pub fn render_table(reports: &[CaseReport]) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "{:<16} {:>8} {:>12} {:>12} {:>12} {:>8}",
        "Benchmark", "Iters", "Mean (ms)", "Min (ms)", "Max (ms)", "Samples"
    );
    for name in COUNTER_COLUMNS {
        let _ = write!(out, " {name:>16}");
    }
    out.push('\n');

    for report in reports {
        let timing = report.timing();
        let samples = report
            .memory()
            .map_or_else(|| "-".to_string(), |m| m.sample_count().to_string());

        let _ = write!(
            out,
            "{:<16} {:>8} {:>12.4} {:>12.4} {:>12.4} {:>8}",
            report.name(),
            timing.iterations(),
            timing.mean_ns() / 1_000_000.0,
            timing.min().as_secs_f64() * 1000.0,
            timing.max().as_secs_f64() * 1000.0,
            samples,
        );
        for name in COUNTER_COLUMNS {
            let cell = report.counters().get(name).map_or_else(
                || "-".to_string(),
                |value| format!("{value:.3} {}", report.unit().label()),
            );
            let _ = write!(out, " {cell:>16}");
        }
        out.push('\n');
    }

    out
}
