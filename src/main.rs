//! # Peakbench
//!
//! Runs every selected maximum-subarray case against one seeded input and
//! prints timing plus peak memory counters. Logs go to stderr; the report goes
//! to stdout so it can be piped.
//!
//! `peakbench analyze` reads a directory of saved JSON reports instead and
//! prints a step-change verdict per case.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use peakbench::cli::{AnalyzeArgs, Cli, Command};
use peakbench::peakbench_monitor::{MemoryMonitor, SystemProbe};
use peakbench::{analyze_dir, render, render_history, run_suite};

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match &cli.command {
        Some(Command::Analyze(args)) => analyze(args),
        None => bench(&cli),
    }
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    let report = analyze_dir(&args.directory, &args.history_config())
        .with_context(|| format!("Failed to analyse {}", args.directory.display()))?;

    let output = render_history(&report, args.format).context("Failed to render history")?;
    print!("{output}");

    if args.fail_on_regression && report.has_regression() {
        bail!("regression detected in {}", report.metric);
    }
    Ok(())
}

fn bench(cli: &Cli) -> Result<()> {
    let config = cli
        .resolve_config()
        .context("Failed to resolve benchmark configuration")?;

    info!(
        cases = config.algorithms.len(),
        data_len = config.data_len,
        interval_us = config.monitor.sampling_interval().as_micros(),
        "peakbench starting"
    );

    let mut monitor = MemoryMonitor::new(SystemProbe::new(), config.monitor.clone());
    let reports = run_suite(&config, &mut monitor);

    let output = render(&reports, cli.format).context("Failed to render report")?;
    print!("{output}");

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
