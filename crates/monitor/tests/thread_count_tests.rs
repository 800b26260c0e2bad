//! Sampler threads do not outlive their window.
//!
//! Kept in its own test binary with a single test, so no other test thread
//! changes the process's task count while it runs.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

#[cfg(target_os = "linux")]
mod linux {
    use std::thread;
    use std::time::{Duration, Instant};

    use peakbench_monitor::{MemoryMonitor, MonitorConfig, MonitorState, StatisticsMode, SystemProbe};

    fn task_count() -> usize {
        std::fs::read_dir("/proc/self/task").unwrap().count()
    }

    /// Task entries can linger for a moment after the join returns.
    fn settled_task_count(expected: usize) -> usize {
        let start = Instant::now();
        let mut count = task_count();
        while count != expected && start.elapsed() < Duration::from_millis(200) {
            thread::sleep(Duration::from_millis(1));
            count = task_count();
        }
        count
    }

    #[test]
    fn test_thread_count_returns_to_baseline_after_each_stop() {
        let config = MonitorConfig::new(Duration::from_micros(200), StatisticsMode::Full).unwrap();
        let mut monitor = MemoryMonitor::new(SystemProbe::new(), config);
        let baseline = task_count();

        for window in 0..200 {
            monitor.start().unwrap();
            assert_eq!(task_count(), baseline + 1, "window {window}: sampler not running");

            monitor.stop().unwrap();
            assert_eq!(monitor.state(), MonitorState::Idle);
            assert_eq!(
                settled_task_count(baseline),
                baseline,
                "window {window}: sampler thread leaked"
            );
        }
    }
}
