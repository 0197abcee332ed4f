//! Shared indirection cell stored in the ambient slot.

use super::WorkContext;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Shared, mutable cell wrapping an optional work context.
///
/// Every copy of the ambient slot forked from the same point refers to the same
/// holder, so [`ContextHolder::invalidate`] is observed by all of them.
pub struct ContextHolder {
    context: Mutex<Option<Arc<dyn WorkContext>>>,
}

impl ContextHolder {
    pub fn new(context: Arc<dyn WorkContext>) -> Arc<Self> {
        Arc::new(Self {
            context: Mutex::new(Some(context)),
        })
    }

    /// Current content, if the holder has not been invalidated.
    pub fn get(&self) -> Option<Arc<dyn WorkContext>> {
        self.context.lock().clone()
    }

    /// Null the content for every alias, returning what was held.
    pub fn invalidate(&self) -> Option<Arc<dyn WorkContext>> {
        self.context.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.context.lock().is_none()
    }

    /// Whether two references point at the same holder object.
    pub fn is_same(self: &Arc<Self>, other: &Arc<Self>) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl fmt::Debug for ContextHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.context.lock();
        f.debug_struct("ContextHolder")
            .field("context_id", &context.as_ref().map(|c| c.id().to_string()))
            .finish()
    }
}
