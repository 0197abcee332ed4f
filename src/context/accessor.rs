//! Ambient context accessor backed by a tokio task-local slot.
//!
//! The slot only exists inside futures entered through [`WorkContextAccessor::scope`],
//! [`WorkContextAccessor::fork`] or [`WorkContextAccessor::spawn`]. A fork copies the
//! parent's holder reference, not the holder itself, so the child starts out sharing
//! the parent's holder and diverges the first time either side calls `set`.

use super::{BackgroundWorkContext, ContextHolder, WorkContext};
use crate::error::ContextError;
use serde::Serialize;
use std::cell::RefCell;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::trace;

type Slot = RefCell<Option<Arc<ContextHolder>>>;

tokio::task_local! {
    static CURRENT_HOLDER: Slot;
}

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessorStats {
    pub sets: u64,
    pub disposes: u64,
}

/// Get/set access to the work context of the current logical task.
///
/// Registered once per process as a singleton and injected where needed.
#[derive(Debug, Default)]
pub struct WorkContextAccessor {
    sets: AtomicU64,
    disposes: AtomicU64,
}

impl WorkContextAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context of the currently executing logical task.
    ///
    /// `None` when nothing is installed, when the holder was invalidated, or when
    /// called outside any ambient scope.
    pub fn context(&self) -> Option<Arc<dyn WorkContext>> {
        CURRENT_HOLDER
            .try_with(|slot| slot.borrow().as_ref().and_then(|holder| holder.get()))
            .ok()
            .flatten()
    }

    /// Holder reference currently stored in the slot.
    pub fn current_holder(&self) -> Option<Arc<ContextHolder>> {
        CURRENT_HOLDER
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    }

    /// Install `value` for the current task and its future descendants.
    ///
    /// The previous holder is invalidated first, so every alias of it (including
    /// the parent's slot when the holder was inherited through a fork) reads `None`.
    pub fn set_context(&self, value: Option<Arc<dyn WorkContext>>) -> Result<(), ContextError> {
        CURRENT_HOLDER
            .try_with(|slot| {
                let mut slot = slot.borrow_mut();
                if let Some(previous) = slot.as_ref() {
                    if let Some(old) = previous.invalidate() {
                        trace!(context_id = old.id(), "Invalidated previous work context holder");
                    }
                }
                if let Some(value) = value {
                    *slot = Some(ContextHolder::new(value));
                }
            })
            .map_err(|_| ContextError::NoAmbientScope)?;

        self.sets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Install a background work context, returning the shared reference.
    pub fn set_background_work_context(
        &self,
        context: BackgroundWorkContext,
    ) -> Result<Arc<dyn WorkContext>, ContextError> {
        let context: Arc<dyn WorkContext> = Arc::new(context);
        self.set_context(Some(context.clone()))?;
        Ok(context)
    }

    /// Clear the current context's buffer and null the holder for every alias.
    ///
    /// No-op when nothing is installed.
    pub fn dispose_context(&self) {
        let disposed = CURRENT_HOLDER
            .try_with(|slot| {
                let slot = slot.borrow();
                let holder = slot.as_ref()?;
                let context = holder.get()?;
                context.clear();
                holder.invalidate();
                Some(context.id().to_string())
            })
            .ok()
            .flatten();

        if let Some(context_id) = disposed {
            self.disposes.fetch_add(1, Ordering::Relaxed);
            trace!(context_id = %context_id, "Disposed work context");
        }
    }

    /// Run `fut` with a fresh, empty ambient slot.
    pub fn scope<F>(&self, fut: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        CURRENT_HOLDER.scope(RefCell::new(None), fut)
    }

    /// Run `fut` with a slot snapshotting the caller's current holder reference.
    pub fn fork<F>(&self, fut: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        CURRENT_HOLDER.scope(RefCell::new(self.current_holder()), fut)
    }

    /// Spawn `fut` onto the runtime as a fork of the caller's logical task.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(self.fork(fut))
    }

    pub fn stats(&self) -> AccessorStats {
        AccessorStats {
            sets: self.sets.load(Ordering::Relaxed),
            disposes: self.disposes.load(Ordering::Relaxed),
        }
    }
}
