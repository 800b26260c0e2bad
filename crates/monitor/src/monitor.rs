//! Background memory sampling for one benchmark window at a time.
//!
//! ```text
//!   Idle --start()--> Running --stop()--> Stopping --join--> Stopped --finalize--> Idle
//! ```
//!
//! `start()` spawns one sampler thread and returns immediately. The sampler
//! owns the [`SampleAggregator`]: it polls the probe, parks for the sampling
//! interval, and repeats until the stop flag is raised. It then takes one final
//! sample and returns the finalized statistics through its join handle. `stop()`
//! raises the flag, wakes the sampler and joins it, so the statistics it returns
//! include every sample taken in the window.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregator::{MemoryStatistics, SampleAggregator, StatisticsMode};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::probe::{FailSoftProbe, MemoryProbe};
use crate::snapshot::ProbeCapabilities;

/// Lifecycle state of a [`MemoryMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitorState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Samples process memory on a background thread between `start` and `stop`.
pub struct MemoryMonitor<P: MemoryProbe + 'static> {
    probe: Arc<P>,
    config: MonitorConfig,
    state: MonitorState,
    sampler: Option<SamplerHandle>,
}

struct SamplerHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<MemoryStatistics>,
}

impl<P: MemoryProbe + 'static> MemoryMonitor<P> {
    #[must_use]
    pub fn new(probe: P, config: MonitorConfig) -> Self {
        Self {
            probe: Arc::new(probe),
            config,
            state: MonitorState::Idle,
            sampler: None,
        }
    }

    #[must_use]
    pub fn with_default_config(probe: P) -> Self {
        Self::new(probe, MonitorConfig::default())
    }

    #[must_use]
    pub const fn state(&self) -> MonitorState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Capabilities of the underlying probe.
    #[must_use]
    pub fn capabilities(&self) -> ProbeCapabilities {
        self.probe.capabilities()
    }

    /// Spawn the sampler and enter Running. Does not block.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::InvalidStateTransition`] unless the monitor is Idle
    /// - [`MonitorError::SpawnFailure`] if the thread cannot be created; the
    ///   monitor stays Idle
    pub fn start(&mut self) -> Result<()> {
        if self.state != MonitorState::Idle {
            return Err(MonitorError::invalid_transition("start", self.state));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let sampler = Sampler {
            probe: FailSoftProbe::new(Arc::clone(&self.probe)),
            aggregator: SampleAggregator::new(self.config.statistics()),
            interval: self.config.sampling_interval(),
            stop: Arc::clone(&stop),
        };

        let thread = thread::Builder::new()
            .name(self.config.thread_name().to_string())
            .spawn(move || sampler.run())
            .map_err(|e| MonitorError::SpawnFailure {
                reason: e.to_string(),
            })?;

        self.sampler = Some(SamplerHandle { stop, thread });
        self.state = MonitorState::Running;
        debug!(
            interval_us = self.config.sampling_interval().as_micros(),
            "memory monitor started"
        );
        Ok(())
    }

    /// Stop the sampler, wait for it to exit and return the window's statistics.
    ///
    /// Blocks until the sampler has taken its final sample. The monitor is Idle
    /// afterwards, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::InvalidStateTransition`] unless the monitor is Running;
    ///   the state is left unchanged
    /// - [`MonitorError::SamplerPanicked`] if the sampler thread panicked
    pub fn stop(&mut self) -> Result<MemoryStatistics> {
        if self.state != MonitorState::Running {
            return Err(MonitorError::invalid_transition("stop", self.state));
        }
        let Some(handle) = self.sampler.take() else {
            self.state = MonitorState::Idle;
            return Err(MonitorError::invalid_transition("stop", MonitorState::Idle));
        };

        self.state = MonitorState::Stopping;
        handle.stop.store(true, Ordering::SeqCst);
        handle.thread.thread().unpark();
        let joined = handle.thread.join();
        self.state = MonitorState::Stopped;

        let result = joined.map_err(|_| MonitorError::SamplerPanicked);
        self.state = MonitorState::Idle;

        match &result {
            Ok(stats) => debug!(
                samples = stats.sample_count(),
                max_resident = stats.max_resident(),
                "memory monitor stopped"
            ),
            Err(e) => warn!("memory monitor stopped without statistics: {e}"),
        }
        result
    }

    /// Start a window that is torn down on every exit path.
    ///
    /// # Errors
    ///
    /// Same as [`MemoryMonitor::start`].
    pub fn running(&mut self) -> Result<RunningWindow<'_, P>> {
        self.start()?;
        Ok(RunningWindow {
            monitor: self,
            finished: false,
        })
    }

    /// Run `workload` inside a monitoring window.
    ///
    /// The workload runs even if the monitor cannot start; the error is then
    /// returned in place of the statistics.
    pub fn measure<R>(&mut self, workload: impl FnOnce() -> R) -> (R, Result<MemoryStatistics>) {
        match self.running() {
            Ok(window) => {
                let output = workload();
                (output, window.finish())
            }
            Err(e) => (workload(), Err(e)),
        }
    }
}

impl<P: MemoryProbe + 'static> Drop for MemoryMonitor<P> {
    fn drop(&mut self) {
        if self.state == MonitorState::Running {
            debug!("memory monitor dropped while running, stopping sampler");
            if let Err(e) = self.stop() {
                warn!("failed to stop memory monitor on drop: {e}");
            }
        }
    }
}

impl<P: MemoryProbe + 'static> fmt::Debug for MemoryMonitor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// A Running monitor borrowed for one window.
///
/// Dropping the window without calling [`RunningWindow::finish`] stops and
/// joins the sampler and discards its statistics.
#[must_use = "dropping the window stops the monitor and discards its statistics"]
pub struct RunningWindow<'m, P: MemoryProbe + 'static> {
    monitor: &'m mut MemoryMonitor<P>,
    finished: bool,
}

impl<P: MemoryProbe + 'static> RunningWindow<'_, P> {
    /// Stop the monitor and return the window's statistics.
    ///
    /// # Errors
    ///
    /// Same as [`MemoryMonitor::stop`].
    pub fn finish(mut self) -> Result<MemoryStatistics> {
        self.finished = true;
        self.monitor.stop()
    }

    /// Statistics mode of the running window.
    #[must_use]
    pub fn statistics(&self) -> StatisticsMode {
        self.monitor.config.statistics()
    }
}

impl<P: MemoryProbe + 'static> Drop for RunningWindow<'_, P> {
    fn drop(&mut self) {
        if !self.finished && self.monitor.state() == MonitorState::Running {
            debug!("monitoring window abandoned, stopping sampler");
            if let Err(e) = self.monitor.stop() {
                warn!("failed to stop abandoned monitoring window: {e}");
            }
        }
    }
}

/// State moved onto the sampler thread.
struct Sampler<P: MemoryProbe> {
    probe: FailSoftProbe<Arc<P>>,
    aggregator: SampleAggregator,
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl<P: MemoryProbe> Sampler<P> {
    fn run(mut self) -> MemoryStatistics {
        while !self.stop.load(Ordering::SeqCst) {
            self.poll();
            thread::park_timeout(self.interval);
        }
        // Last data point after the stop request.
        self.poll();
        self.aggregator.finalize()
    }

    fn poll(&mut self) {
        let snapshot = self.probe.sample();
        self.aggregator.observe(snapshot);
    }
}
