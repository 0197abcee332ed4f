//! Integration tests for buffer retention
//!
//! Buffers stay reachable for as long as anything references the context or its
//! holder; disposing releases them immediately regardless of outstanding aliases.

use std::io::Cursor;
use std::sync::Arc;
use workctx::config::RunConfig;
use workctx::context::{BackgroundWorkContext, ContextHolder, WorkContext};
use workctx::launcher::BoundedLauncher;
use workctx::probe::run_probe;
use workctx::process::MemorySink;
use workctx::scope::ServiceProvider;

const BUFFER: usize = 4096;

fn provider(dispose_on_complete: bool) -> Arc<ServiceProvider> {
    ServiceProvider::builder()
        .config(RunConfig {
            buffer_size: BUFFER,
            io_delay_ms: 1,
            dispose_on_complete,
            ..RunConfig::default()
        })
        .sink(Arc::new(MemorySink::new()))
        .build()
}

/// Run one forked task that installs a context and hands its holder out.
async fn escape_holder(provider: &Arc<ServiceProvider>, dispose: bool) -> Arc<ContextHolder> {
    let accessor = provider.accessor();
    let scope = provider.create_scope();
    let inner = accessor.clone();
    accessor
        .spawn(async move {
            inner
                .set_background_work_context(BackgroundWorkContext::new(&scope.handle()).unwrap())
                .unwrap();
            let holder = inner.current_holder().unwrap();
            if dispose {
                inner.dispose_context();
            }
            holder
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_undisposed_context_retained_by_alias() {
    let provider = provider(false);
    let gauge = provider.gauge();

    let holder = escape_holder(&provider, false).await;

    // The task and its scope are gone, but the escaped holder keeps the buffer.
    assert_eq!(gauge.snapshot().live_bytes, BUFFER);
    assert_eq!(holder.get().map(|c| c.buffer_len()), Some(BUFFER));

    drop(holder);
    assert_eq!(gauge.snapshot().live_bytes, 0);
}

#[tokio::test]
async fn test_disposed_context_released_despite_alias() {
    let provider = provider(false);
    let gauge = provider.gauge();

    let holder = escape_holder(&provider, true).await;

    assert!(holder.is_empty());
    assert_eq!(gauge.snapshot().live_bytes, 0);
}

#[tokio::test]
async fn test_context_scope_handle_dangles_after_unit() {
    let provider = provider(false);
    let holder = escape_holder(&provider, false).await;

    let context: Arc<dyn WorkContext> = holder.get().unwrap();
    assert!(!context.scope().is_live());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispose_on_complete_counts_every_unit() {
    let provider = provider(true);
    let launcher = BoundedLauncher::new(provider.clone());

    let report = launcher.run(40).await.unwrap();

    assert_eq!(report.completed, 40);
    assert_eq!(provider.accessor().stats().disposes, 40);
    assert_eq!(report.live_bytes_after_barrier, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_peak_retention_bounded_by_gate() {
    let sink = Arc::new(MemorySink::new());
    let config = RunConfig {
        units: 30,
        max_concurrent: 5,
        buffer_size: BUFFER,
        io_delay_ms: 5,
        pause: false,
        ..RunConfig::default()
    };

    let mut input = Cursor::new("");
    let outcome = run_probe(config, sink, &mut input).await.unwrap();

    let teardown = outcome.retention.last().unwrap();
    assert_eq!(teardown.live_bytes, 0);
    assert_eq!(teardown.live_buffers, 0);
    assert!(teardown.peak_bytes <= 5 * BUFFER);
    assert!(teardown.peak_bytes >= BUFFER);
}
