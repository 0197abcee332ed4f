//! Bounded task launcher
//!
//! Runs N units of work, admitting at most K at a time through a counting
//! semaphore. The permit is acquired before a unit is spawned and moved into
//! it, so it is released on every exit path of the unit body, panics included.
//! Each unit runs as a fork of the launcher's ambient slot.

mod limits;

pub use limits::{Limit, Limits, DEFAULT_MAX_CONCURRENT_UNITS};

use crate::context::BackgroundWorkContext;
use crate::error::ProbeError;
use crate::scope::ServiceProvider;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Tracks how many unit bodies are mid-execution
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        InFlightGuard(self.clone())
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }
}

struct InFlightGuard(Arc<ConcurrencyGauge>);

impl InFlightGuard {
    fn complete(&self) {
        self.0.completed.fetch_add(1, Ordering::AcqRel);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Outcome of a launcher run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub units: usize,
    pub completed: usize,
    pub max_concurrent: Option<usize>,
    pub peak_in_flight: usize,
    /// Units whose read-back context id differed from the one they installed
    pub isolation_violations: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub live_bytes_after_barrier: usize,
}

fn serialize_millis<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(value.as_millis())
}

/// Launches units of work under an admission gate
pub struct BoundedLauncher {
    provider: Arc<ServiceProvider>,
    gate: Option<Arc<Semaphore>>,
    max_concurrent: Option<usize>,
    concurrency: Arc<ConcurrencyGauge>,
    dispose_on_complete: bool,
}

impl BoundedLauncher {
    /// Launcher configured from the provider's run configuration.
    pub fn new(provider: Arc<ServiceProvider>) -> Self {
        let limits = Limits::from(provider.config().max_concurrent);
        Self::with_limits(provider, limits)
    }

    pub fn with_limits(provider: Arc<ServiceProvider>, limits: Limits) -> Self {
        let max_concurrent = limits.max_concurrent_units.resolve();
        let dispose_on_complete = provider.config().dispose_on_complete;
        Self {
            provider,
            gate: max_concurrent
                .map(|permits| Arc::new(Semaphore::new(permits.min(Semaphore::MAX_PERMITS)))),
            max_concurrent,
            concurrency: Arc::new(ConcurrencyGauge::new()),
            dispose_on_complete,
        }
    }

    pub fn concurrency(&self) -> Arc<ConcurrencyGauge> {
        self.concurrency.clone()
    }

    /// Run `units` units of work and wait for all of them.
    ///
    /// The first unit error (or panic) fails the run, but only after every
    /// spawned unit has finished.
    pub async fn run(&self, units: usize) -> Result<RunReport, ProbeError> {
        let accessor = self.provider.accessor();
        let started = Instant::now();
        let mut handles = Vec::with_capacity(units);

        info!(
            units,
            max_concurrent = ?self.max_concurrent,
            dispose_on_complete = self.dispose_on_complete,
            "Launching work units"
        );

        for index in 0..units {
            let permit = match &self.gate {
                Some(gate) => Some(
                    gate.clone()
                        .acquire_owned()
                        .await
                        .map_err(|_| ProbeError::GateClosed)?,
                ),
                None => None,
            };

            let provider = self.provider.clone();
            let concurrency = self.concurrency.clone();
            let dispose = self.dispose_on_complete;

            // Snapshot the launcher's slot now; the unit's slot (and the context it
            // holds) is dropped before the permit is returned.
            let unit = accessor.fork(run_unit(index, provider, dispose));
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let in_flight = concurrency.enter();
                let isolated = unit.await?;
                in_flight.complete();
                Ok::<bool, ProbeError>(isolated)
            }));
        }

        let mut first_error = None;
        let mut completed = 0;
        let mut isolation_violations = 0;
        for result in futures::future::join_all(handles).await {
            let outcome = result.map_err(ProbeError::from).and_then(|inner| inner);
            match outcome {
                Ok(isolated) => {
                    completed += 1;
                    if !isolated {
                        isolation_violations += 1;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Work unit failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let report = RunReport {
            units,
            completed,
            max_concurrent: self.max_concurrent,
            peak_in_flight: self.concurrency.peak(),
            isolation_violations,
            elapsed: started.elapsed(),
            live_bytes_after_barrier: self.provider.gauge().snapshot().live_bytes,
        };
        if report.isolation_violations > 0 {
            warn!(violations = report.isolation_violations, "Work contexts leaked across units");
        }
        info!(
            completed = report.completed,
            peak_in_flight = report.peak_in_flight,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "All work units completed"
        );
        Ok(report)
    }
}

/// Body of a single unit. Returns whether the unit read back its own context.
async fn run_unit(
    index: usize,
    provider: Arc<ServiceProvider>,
    dispose: bool,
) -> Result<bool, ProbeError> {
    let scope = provider.create_scope();
    let accessor = scope.accessor();

    let context = BackgroundWorkContext::new(&scope.handle())?;
    let installed = accessor.set_background_work_context(context)?;
    debug!(
        unit = index,
        scope = %scope.id(),
        context_id = installed.id(),
        "Work context installed"
    );

    let printed = scope.work_unit().process().await?;
    // Read again after the I/O suspension, which may resume on another worker.
    let resumed = accessor.context().map(|context| context.id().to_string());
    let isolated = printed == installed.id() && resumed.as_deref() == Some(installed.id());

    if dispose {
        accessor.dispose_context();
    }
    Ok(isolated)
}
