//! Integration tests for the bounded launcher
//!
//! Tests cover:
//! - End-to-end run with 2000 units and a gate of 200
//! - Admission bound and barrier completeness
//! - Failure propagation and permit release on error and panic

use proptest::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use workctx::config::RunConfig;
use workctx::error::ProbeError;
use workctx::launcher::{BoundedLauncher, Limits};
use workctx::probe::run_probe;
use workctx::process::{LineSink, MemorySink};
use workctx::scope::ServiceProvider;

/// Split `ThreadID:<thread-id>-<context-id>` into its parts.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    line.strip_prefix("ThreadID:")?.split_once('-')
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_end_to_end_two_thousand_units() {
    let sink = Arc::new(MemorySink::new());
    let config = RunConfig {
        units: 2000,
        max_concurrent: 200,
        buffer_size: 1024,
        io_delay_ms: 10,
        pause: false,
        ..RunConfig::default()
    };

    let mut input = Cursor::new("");
    let outcome = run_probe(config, sink.clone(), &mut input).await.unwrap();

    let lines = sink.lines();
    assert_eq!(lines.len(), 2000);

    let mut ids = HashSet::new();
    for line in &lines {
        let (thread_id, context_id) = parse_line(line).expect("malformed line");
        assert!(thread_id.chars().all(|c| c.is_ascii_digit()), "bad thread id in {}", line);
        assert!(uuid::Uuid::parse_str(context_id).is_ok(), "bad context id in {}", line);
        assert!(ids.insert(context_id.to_string()), "duplicate context id {}", context_id);
    }

    assert_eq!(outcome.run.completed, 2000);
    assert!(outcome.run.peak_in_flight <= 200);
    assert_eq!(outcome.run.isolation_violations, 0);
    assert!(outcome.retention.iter().all(|r| !r.top_level_context));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_barrier_waits_for_every_unit() {
    let sink = Arc::new(MemorySink::new());
    let provider = ServiceProvider::builder()
        .config(RunConfig {
            buffer_size: 64,
            io_delay_ms: 20,
            ..RunConfig::default()
        })
        .sink(sink.clone())
        .build();
    let launcher = BoundedLauncher::with_limits(provider.clone(), Limits::from(4usize));

    let report = launcher.run(25).await.unwrap();

    assert_eq!(report.completed, 25);
    assert_eq!(sink.len(), 25);
    assert_eq!(launcher.concurrency().in_flight(), 0);
    assert_eq!(provider.scopes_created(), 25);
    assert_eq!(report.live_bytes_after_barrier, 0);
}

/// Fails (or panics) on the n-th line written.
struct FailingSink {
    written: AtomicUsize,
    fail_at: usize,
    panic: bool,
}

impl LineSink for FailingSink {
    fn write_line(&self, _line: &str) -> Result<(), ProbeError> {
        let n = self.written.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_at {
            if self.panic {
                panic!("sink exploded");
            }
            return Err(ProbeError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdout closed",
            )));
        }
        Ok(())
    }
}

fn failing_launcher(panic: bool) -> (BoundedLauncher, Arc<FailingSink>) {
    let sink = Arc::new(FailingSink {
        written: AtomicUsize::new(0),
        fail_at: 2,
        panic,
    });
    let provider = ServiceProvider::builder()
        .config(RunConfig {
            buffer_size: 16,
            io_delay_ms: 1,
            ..RunConfig::default()
        })
        .sink(sink.clone())
        .build();
    // A single permit: a leaked permit would deadlock the remaining units.
    (BoundedLauncher::with_limits(provider, Limits::from(1usize)), sink)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unit_error_fails_run_after_barrier() {
    let (launcher, sink) = failing_launcher(false);

    let result = tokio::time::timeout(Duration::from_secs(10), launcher.run(5))
        .await
        .expect("permit leaked on error path");

    assert!(matches!(result, Err(ProbeError::Io(_))));
    assert_eq!(sink.written.load(Ordering::SeqCst), 5);
    assert_eq!(launcher.concurrency().completed(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unit_panic_releases_permit() {
    let (launcher, sink) = failing_launcher(true);

    let result = tokio::time::timeout(Duration::from_secs(10), launcher.run(5))
        .await
        .expect("permit leaked on panic");

    match result {
        Err(ProbeError::TaskPanicked(message)) => assert_eq!(message, "sink exploded"),
        other => panic!("expected panic error, got {:?}", other.map(|r| r.completed)),
    }
    assert_eq!(sink.written.load(Ordering::SeqCst), 5);
    assert_eq!(launcher.concurrency().in_flight(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_admission_bound(k in 1usize..6, extra in 1usize..30) {
        let n = k + extra;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        let provider = ServiceProvider::builder()
            .config(RunConfig { buffer_size: 8, io_delay_ms: 2, ..RunConfig::default() })
            .sink(Arc::new(MemorySink::new()))
            .build();
        let launcher = BoundedLauncher::with_limits(provider, Limits::from(k));

        let report = runtime.block_on(launcher.run(n)).unwrap();

        prop_assert!(report.peak_in_flight <= k);
        prop_assert_eq!(report.completed, n);
    }
}
