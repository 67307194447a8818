//! Stress tests for the controller.
//!
//! These runs hammer one controller from many threads and count operations
//! that failed for any reason other than a lost bid for control.

use crate::fixtures::{OpenCounter, TestResource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use telemdb_core::{Authority, ControlResult, Controller, GateConfig, Subject, TimeRange};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Open/release cycles per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Authority levels gates pick from. Small values force ties.
    pub authority_levels: u8,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            authority_levels: 3,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    successful: AtomicUsize,
    failed: AtomicUsize,
}

impl Tally {
    /// Counts an outcome. Losing a bid for control is not a failure.
    fn record<T>(&self, result: &ControlResult<T>) {
        match result {
            Err(err) if !err.is_unauthorized() => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.successful.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn finish(&self, start: Instant) -> StressTestResult {
        StressTestResult::new(
            self.successful.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            start.elapsed(),
        )
    }
}

/// Many threads compete for a single region covering all time.
///
/// Each cycle opens a gate, authorizes, changes authority, authorizes again
/// and releases.
pub fn stress_contended_region(
    controller: &Controller<TestResource>,
    config: &StressConfig,
) -> StressTestResult {
    let tally = Tally::default();
    let counter = OpenCounter::new();
    let levels = config.authority_levels.max(1);
    let start = Instant::now();

    thread::scope(|s| {
        for t in 0..config.threads {
            let tally = &tally;
            let counter = &counter;
            s.spawn(move || {
                for i in 0..config.operations {
                    let authority = Authority::new(((t + i) % levels as usize) as u8);
                    let gate_config = GateConfig::new(
                        Subject::new(format!("t{t}-{i}"), format!("thread {t}")),
                        TimeRange::MAX,
                        authority,
                    )
                    .open_resource(counter.callback(1));
                    let opened = controller.open_gate(gate_config);
                    tally.record(&opened);
                    let Ok((gate, _)) = opened else { continue };

                    tally.record(&gate.authorize());
                    gate.set_authority(Authority::new(((t + i + 1) % levels as usize) as u8));
                    tally.record(&gate.authorize());
                    gate.release();
                }
            });
        }
    });

    tally.finish(start)
}

/// Threads churn through their own regions, creating and removing them.
///
/// Thread `t` only opens gates on `[t, t + 1)` seconds, so regions are
/// created and fully released concurrently without ever overlapping.
pub fn stress_region_churn(
    controller: &Controller<TestResource>,
    config: &StressConfig,
) -> StressTestResult {
    let tally = Tally::default();
    let counter = OpenCounter::new();
    let start = Instant::now();

    thread::scope(|s| {
        for t in 0..config.threads {
            let tally = &tally;
            let counter = &counter;
            s.spawn(move || {
                let range = TimeRange::from_seconds(t as i64, t as i64 + 1);
                for i in 0..config.operations {
                    let first = controller.open_gate(
                        GateConfig::new(Subject::with_key(format!("a{t}-{i}")), range, Authority::new(1))
                            .open_resource(counter.callback(t as u32)),
                    );
                    tally.record(&first);
                    let second = controller.open_gate(
                        GateConfig::new(Subject::with_key(format!("b{t}-{i}")), range, Authority::new(2))
                            .open_resource(counter.callback(t as u32)),
                    );
                    tally.record(&second);
                    if let Ok((gate, _)) = &second {
                        tally.record(&gate.authorize());
                    }
                    // Dropping both gates fully releases the region.
                }
            });
        }
    });

    tally.finish(start)
}
