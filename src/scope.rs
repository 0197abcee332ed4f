//! Dependency-resolution registry.
//!
//! A [`ServiceProvider`] carries two registrations: the process-wide
//! [`WorkContextAccessor`] singleton and a scoped [`WorkUnit`]. Every unit of work
//! opens its own [`ServiceScope`]; dropping the scope releases whatever it resolved.

use crate::config::RunConfig;
use crate::context::WorkContextAccessor;
use crate::inspection::BufferGauge;
use crate::process::{ConsoleSink, LineSink, WorkUnit};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::trace;

/// Monotonic identifier for scopes created by one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Builder for [`ServiceProvider`]
pub struct ServiceProviderBuilder {
    config: RunConfig,
    sink: Option<Arc<dyn LineSink>>,
}

impl ServiceProviderBuilder {
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the output sink (defaults to stdout).
    pub fn sink(mut self, sink: Arc<dyn LineSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Arc<ServiceProvider> {
        Arc::new(ServiceProvider {
            accessor: Arc::new(WorkContextAccessor::new()),
            gauge: Arc::new(BufferGauge::new()),
            sink: self.sink.unwrap_or_else(|| Arc::new(ConsoleSink)),
            config: self.config,
            next_scope_id: AtomicU64::new(1),
        })
    }
}

/// Root of the registry; lives for the whole run
pub struct ServiceProvider {
    accessor: Arc<WorkContextAccessor>,
    gauge: Arc<BufferGauge>,
    sink: Arc<dyn LineSink>,
    config: RunConfig,
    next_scope_id: AtomicU64,
}

impl ServiceProvider {
    pub fn builder() -> ServiceProviderBuilder {
        ServiceProviderBuilder {
            config: RunConfig::default(),
            sink: None,
        }
    }

    /// Resolve the singleton accessor.
    pub fn accessor(&self) -> Arc<WorkContextAccessor> {
        self.accessor.clone()
    }

    pub fn gauge(&self) -> Arc<BufferGauge> {
        self.gauge.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn create_scope(self: &Arc<Self>) -> Arc<ServiceScope> {
        let id = ScopeId(self.next_scope_id.fetch_add(1, Ordering::Relaxed));
        trace!(scope = %id, "Scope opened");
        Arc::new(ServiceScope {
            id,
            provider: self.clone(),
            work_unit: Mutex::new(None),
        })
    }

    pub fn scopes_created(&self) -> u64 {
        self.next_scope_id.load(Ordering::Relaxed) - 1
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("config", &self.config)
            .field("scopes_created", &self.scopes_created())
            .finish()
    }
}

/// Per-unit resolution scope
pub struct ServiceScope {
    id: ScopeId,
    provider: Arc<ServiceProvider>,
    work_unit: Mutex<Option<Arc<WorkUnit>>>,
}

impl ServiceScope {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Non-owning handle for payloads that only look up collaborators.
    pub fn handle(self: &Arc<Self>) -> ScopeHandle {
        ScopeHandle(Arc::downgrade(self))
    }

    pub fn accessor(&self) -> Arc<WorkContextAccessor> {
        self.provider.accessor()
    }

    pub fn gauge(&self) -> Arc<BufferGauge> {
        self.provider.gauge()
    }

    pub fn config(&self) -> &RunConfig {
        self.provider.config()
    }

    /// Resolve the scoped work unit, creating it on first use.
    pub fn work_unit(&self) -> Arc<WorkUnit> {
        self.work_unit
            .lock()
            .get_or_insert_with(|| {
                Arc::new(WorkUnit::new(
                    self.provider.accessor(),
                    self.provider.sink.clone(),
                    Duration::from_millis(self.provider.config.io_delay_ms),
                ))
            })
            .clone()
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        trace!(scope = %self.id, "Scope released");
    }
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceScope").field("id", &self.id).finish()
    }
}

/// Weak reference to a [`ServiceScope`]
#[derive(Debug, Clone, Default)]
pub struct ScopeHandle(Weak<ServiceScope>);

impl ScopeHandle {
    /// Handle that never resolves.
    pub fn null() -> Self {
        Self(Weak::new())
    }

    pub fn upgrade(&self) -> Option<Arc<ServiceScope>> {
        self.0.upgrade()
    }

    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}
