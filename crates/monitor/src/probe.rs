//! Process memory probes.
//!
//! [`MemoryProbe`] is the raw, fallible OS query. [`FailSoftProbe`] wraps a
//! probe so the sampler always gets a snapshot: a failed query yields the last
//! good snapshot (or [`MemorySnapshot::ZERO`]) instead of an error.
//!
//! [`SystemProbe`] is the platform implementation for the current process:
//! - Linux reads `VmHWM` from `/proc/self/status`. The kernel keeps it as a
//!   high-water mark, the same figure `getrusage` reports as `ru_maxrss`.
//!   Virtual memory is reported as unsupported.
//! - Other platforms use `sysinfo`: working set and private usage on Windows,
//!   current resident and virtual size elsewhere.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::ProbeError;
use crate::snapshot::{MemorySnapshot, ProbeCapabilities};

/// A stateless query for the memory footprint of the current process.
///
/// Implementations are called from the sampler thread, never from the thread
/// that created the monitor.
pub trait MemoryProbe: Send + Sync {
    /// Query the footprint right now.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the OS query fails or is unsupported.
    fn query(&self) -> Result<MemorySnapshot, ProbeError>;

    /// What each snapshot figure means on this probe.
    fn capabilities(&self) -> ProbeCapabilities;
}

impl<P: MemoryProbe + ?Sized> MemoryProbe for Arc<P> {
    fn query(&self) -> Result<MemorySnapshot, ProbeError> {
        (**self).query()
    }

    fn capabilities(&self) -> ProbeCapabilities {
        (**self).capabilities()
    }
}

/// Probe wrapper that never fails.
#[derive(Debug)]
pub struct FailSoftProbe<P> {
    inner: P,
    last_good: MemorySnapshot,
    failures: u64,
}

impl<P: MemoryProbe> FailSoftProbe<P> {
    #[must_use]
    pub const fn new(inner: P) -> Self {
        Self {
            inner,
            last_good: MemorySnapshot::ZERO,
            failures: 0,
        }
    }

    /// Sample the footprint, substituting the last good snapshot on failure.
    pub fn sample(&mut self) -> MemorySnapshot {
        match self.inner.query() {
            Ok(snapshot) => {
                self.last_good = snapshot;
                snapshot
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures == 1 {
                    warn!("memory probe failed, reusing last good snapshot: {e}");
                } else {
                    trace!(failures = self.failures, "memory probe failed again: {e}");
                }
                self.last_good
            }
        }
    }

    /// Number of failed queries so far.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    /// The wrapped probe.
    #[must_use]
    pub const fn inner(&self) -> &P {
        &self.inner
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::path::PathBuf;

    use crate::error::ProbeError;
    use crate::snapshot::{Capability, MemorySnapshot, ProbeCapabilities};

    use super::MemoryProbe;

    const SELF_STATUS: &str = "/proc/self/status";

    /// Memory fields of `/proc/<pid>/status`, in kilobytes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProcStatus {
        pub peak_resident_kb: u64,
    }

    /// Parse the memory fields of a `/proc/<pid>/status` document.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Unavailable`] if `VmHWM` is missing or malformed.
    pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ProbeError> {
        let line = content
            .lines()
            .find(|line| line.starts_with("VmHWM:"))
            .ok_or_else(|| ProbeError::unavailable("VmHWM not found"))?;

        Ok(ProcStatus {
            peak_resident_kb: parse_kb_value(line)?,
        })
    }

    /// Format: "`FieldName`:    12345 kB"
    fn parse_kb_value(line: &str) -> Result<u64, ProbeError> {
        line.split_whitespace()
            .nth(1)
            .ok_or_else(|| ProbeError::unavailable(format!("missing value in line: {line}")))?
            .parse::<u64>()
            .map_err(|e| ProbeError::unavailable(format!("failed to parse '{line}': {e}")))
    }

    /// Probe for the current process backed by `/proc/self/status`.
    #[derive(Debug, Clone)]
    pub struct SystemProbe {
        status_path: PathBuf,
    }

    impl SystemProbe {
        #[must_use]
        pub fn new() -> Self {
            Self::with_status_path(SELF_STATUS)
        }

        /// Read a different status file. Used to probe fixtures.
        #[must_use]
        pub fn with_status_path(path: impl Into<PathBuf>) -> Self {
            Self {
                status_path: path.into(),
            }
        }
    }

    impl Default for SystemProbe {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryProbe for SystemProbe {
        fn query(&self) -> Result<MemorySnapshot, ProbeError> {
            let content = std::fs::read_to_string(&self.status_path).map_err(|e| {
                ProbeError::unavailable(format!(
                    "failed to read {}: {e}",
                    self.status_path.display()
                ))
            })?;
            let status = parse_proc_status(&content)?;
            Ok(MemorySnapshot::new(
                status.peak_resident_kb.saturating_mul(1024),
                0,
            ))
        }

        fn capabilities(&self) -> ProbeCapabilities {
            ProbeCapabilities::new(Capability::PeakTracked, Capability::Unsupported)
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use std::sync::Mutex;

    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    use crate::error::ProbeError;
    use crate::snapshot::{Capability, MemorySnapshot, ProbeCapabilities};

    use super::MemoryProbe;

    /// Probe for the current process backed by `sysinfo`.
    pub struct SystemProbe {
        pid: Option<Pid>,
        system: Mutex<System>,
    }

    impl SystemProbe {
        #[must_use]
        pub fn new() -> Self {
            Self {
                pid: sysinfo::get_current_pid().ok(),
                system: Mutex::new(System::new()),
            }
        }
    }

    impl Default for SystemProbe {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryProbe for SystemProbe {
        fn query(&self) -> Result<MemorySnapshot, ProbeError> {
            if !sysinfo::IS_SUPPORTED_SYSTEM {
                return Err(ProbeError::Unsupported {
                    platform: std::env::consts::OS,
                });
            }
            let pid = self
                .pid
                .ok_or_else(|| ProbeError::unavailable("current pid is unknown"))?;
            let mut system = self
                .system
                .lock()
                .map_err(|_| ProbeError::unavailable("probe state poisoned"))?;

            system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                ProcessRefreshKind::new().with_memory(),
            );

            system
                .process(pid)
                .map(|process| MemorySnapshot::new(process.memory(), process.virtual_memory()))
                .ok_or_else(|| ProbeError::unavailable(format!("process {pid} not found")))
        }

        fn capabilities(&self) -> ProbeCapabilities {
            if sysinfo::IS_SUPPORTED_SYSTEM {
                ProbeCapabilities::new(Capability::Instantaneous, Capability::Instantaneous)
            } else {
                ProbeCapabilities::UNSUPPORTED
            }
        }
    }
}

#[cfg(target_os = "linux")]
pub use platform::{ProcStatus, parse_proc_status};
pub use platform::SystemProbe;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::snapshot::Capability;

    /// Succeeds on odd calls, fails on even calls.
    struct FlakyProbe {
        calls: AtomicU64,
    }

    impl MemoryProbe for FlakyProbe {
        fn query(&self) -> Result<MemorySnapshot, ProbeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call % 2 == 1 {
                Ok(MemorySnapshot::new(call * 100, call))
            } else {
                Err(ProbeError::unavailable("flaky"))
            }
        }

        fn capabilities(&self) -> ProbeCapabilities {
            ProbeCapabilities::new(Capability::Instantaneous, Capability::Instantaneous)
        }
    }

    struct BrokenProbe;

    impl MemoryProbe for BrokenProbe {
        fn query(&self) -> Result<MemorySnapshot, ProbeError> {
            Err(ProbeError::Unsupported { platform: "test" })
        }

        fn capabilities(&self) -> ProbeCapabilities {
            ProbeCapabilities::UNSUPPORTED
        }
    }

    #[test]
    fn test_fail_soft_reuses_last_good_snapshot() {
        let mut probe = FailSoftProbe::new(FlakyProbe {
            calls: AtomicU64::new(0),
        });

        assert_eq!(probe.sample(), MemorySnapshot::new(100, 1));
        assert_eq!(probe.sample(), MemorySnapshot::new(100, 1));
        assert_eq!(probe.sample(), MemorySnapshot::new(300, 3));
        assert_eq!(probe.failures(), 1);
    }

    #[test]
    fn test_fail_soft_without_good_sample_is_zero() {
        let mut probe = FailSoftProbe::new(BrokenProbe);
        assert_eq!(probe.sample(), MemorySnapshot::ZERO);
        assert_eq!(probe.sample(), MemorySnapshot::ZERO);
        assert_eq!(probe.failures(), 2);
    }

    #[test]
    fn test_arc_probe_delegates() {
        let probe = Arc::new(FlakyProbe {
            calls: AtomicU64::new(0),
        });
        let shared = Arc::clone(&probe);
        assert_eq!(shared.query(), Ok(MemorySnapshot::new(100, 1)));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(shared.capabilities().resident, Capability::Instantaneous);
    }

    #[cfg(target_os = "linux")]
    mod linux {
        use std::io::Write;

        use tempfile::NamedTempFile;

        use super::super::*;
        use crate::snapshot::Capability;

        const STATUS_FIXTURE: &str = "Name:\tpeakbench\nVmPeak:\t  20480 kB\nVmSize:\t  18432 kB\nVmHWM:\t    3072 kB\nVmRSS:\t    2048 kB\nThreads:\t2\n";

        #[test]
        fn test_parse_proc_status() {
            let status = parse_proc_status(STATUS_FIXTURE).unwrap();
            assert_eq!(status, ProcStatus { peak_resident_kb: 3072 });
        }

        #[test]
        fn test_parse_proc_status_requires_hwm() {
            let result = parse_proc_status("Name:\tx\nVmRSS:\t 10 kB\n");
            assert!(matches!(result, Err(ProbeError::Unavailable { .. })));
        }

        #[test]
        fn test_parse_proc_status_rejects_garbage_value() {
            let result = parse_proc_status("VmHWM:\t lots kB\n");
            assert!(matches!(result, Err(ProbeError::Unavailable { .. })));

            let result = parse_proc_status("VmHWM:\n");
            assert!(matches!(result, Err(ProbeError::Unavailable { .. })));
        }

        #[test]
        fn test_system_probe_reads_fixture_in_bytes() {
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{STATUS_FIXTURE}").unwrap();
            file.flush().unwrap();

            let probe = SystemProbe::with_status_path(file.path());
            let snapshot = probe.query().unwrap();
            assert_eq!(snapshot.resident_bytes(), 3072 * 1024);
            assert_eq!(snapshot.virtual_bytes(), 0);
        }

        #[test]
        fn test_system_probe_missing_file_is_unavailable() {
            let probe = SystemProbe::with_status_path("/nonexistent/peakbench/status");
            assert!(matches!(
                probe.query(),
                Err(ProbeError::Unavailable { .. })
            ));
        }

        #[test]
        fn test_system_probe_self() {
            let probe = SystemProbe::new();
            let snapshot = probe.query().unwrap();
            assert!(snapshot.resident_bytes() > 0);
            assert_eq!(probe.capabilities().resident, Capability::PeakTracked);
            assert_eq!(probe.capabilities().virtual_memory, Capability::Unsupported);
        }
    }
}
