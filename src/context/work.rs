//! Work context payloads.

use crate::error::ContextError;
use crate::inspection::BufferGauge;
use crate::scope::ScopeHandle;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Default per-context buffer size (2 MiB)
pub const DEFAULT_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// A payload installed into the ambient slot.
pub trait WorkContext: Send + Sync + fmt::Debug {
    /// Identifier assigned at creation; never changes afterwards.
    fn id(&self) -> &str;

    /// Non-owning handle to the scope the context was created in.
    fn scope(&self) -> &ScopeHandle;

    /// Release the owned buffer. One-way and idempotent.
    fn clear(&self);

    /// Bytes currently held by the context.
    fn buffer_len(&self) -> usize;
}

/// Work context for background units of work.
///
/// Holds a large buffer filled with OS random bytes, standing in for expensive
/// per-request state.
pub struct BackgroundWorkContext {
    id: String,
    buffer: Mutex<Vec<u8>>,
    cleared: AtomicBool,
    scope: ScopeHandle,
    gauge: Arc<BufferGauge>,
}

impl BackgroundWorkContext {
    /// Create a context sized by the scope's run configuration.
    pub fn new(scope: &ScopeHandle) -> Result<Self, ContextError> {
        let live = scope.upgrade().ok_or(ContextError::InvalidArgument("scope"))?;
        Self::with_buffer_size(scope, live.config().buffer_size)
    }

    /// Create a context with an explicit buffer size.
    pub fn with_buffer_size(scope: &ScopeHandle, buffer_size: usize) -> Result<Self, ContextError> {
        let live = scope.upgrade().ok_or(ContextError::InvalidArgument("scope"))?;
        let gauge = live.gauge();

        let mut buffer = vec![0u8; buffer_size];
        OsRng.fill_bytes(&mut buffer);
        gauge.register(buffer.len());

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            buffer: Mutex::new(buffer),
            cleared: AtomicBool::new(false),
            scope: scope.clone(),
            gauge,
        })
    }
}

impl WorkContext for BackgroundWorkContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> &ScopeHandle {
        &self.scope
    }

    fn clear(&self) {
        if self.cleared.swap(true, Ordering::AcqRel) {
            return;
        }
        let released = std::mem::take(&mut *self.buffer.lock());
        self.gauge.release(released.len());
    }

    fn buffer_len(&self) -> usize {
        self.buffer.lock().len()
    }
}

impl Drop for BackgroundWorkContext {
    fn drop(&mut self) {
        if !*self.cleared.get_mut() {
            self.gauge.release(self.buffer.get_mut().len());
        }
    }
}

impl fmt::Debug for BackgroundWorkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundWorkContext")
            .field("id", &self.id)
            .field("buffer_len", &self.buffer_len())
            .field("cleared", &self.cleared.load(Ordering::Acquire))
            .finish()
    }
}
