//! Maximum-subarray benchmarks with peak memory per measurement.
//!
//! Each criterion measurement runs inside one monitoring window; the counters
//! of the window are printed to stderr next to criterion's timing output.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use peakbench::{MemoryUnit, publish};
use peakbench_monitor::{MemoryMonitor, MonitorConfig, SystemProbe};
use peakbench_subarray::{Algorithm, ValueRange, random_values};

const SIZES: [usize; 3] = [100, 1_000, 4_000];

fn bench_algorithms(c: &mut Criterion) {
    let mut monitor = MemoryMonitor::new(SystemProbe::new(), MonitorConfig::default());
    let capabilities = monitor.capabilities();

    for algorithm in Algorithm::ALL {
        let mut group = c.benchmark_group(algorithm.name());

        for size in SIZES {
            let data = random_values(size, 42, ValueRange::default());

            group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
                b.iter_custom(|iters| {
                    let (elapsed, stats) = monitor.measure(|| {
                        let start = Instant::now();
                        for _ in 0..iters {
                            black_box(algorithm.run(black_box(data)));
                        }
                        start.elapsed()
                    });

                    if let Ok(stats) = stats {
                        let counters = publish(&stats, capabilities, MemoryUnit::MiB);
                        for (name, value) in counters.iter() {
                            eprintln!("{}/{size}: {name} = {value:.3} MiB", algorithm.name());
                        }
                    }
                    elapsed
                });
            });
        }

        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(3));
    targets = bench_algorithms
}
criterion_main!(benches);
