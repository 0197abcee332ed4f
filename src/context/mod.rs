//! Ambient work context
//!
//! A work context is installed once per logical task and read back by anything
//! running on that task's continuation chain. The ambient slot stores a shared
//! [`ContextHolder`] rather than the context itself, so invalidating the holder
//! clears the value for every forked copy of the slot at once.

mod accessor;
mod holder;
mod work;

pub use accessor::{AccessorStats, WorkContextAccessor};
pub use holder::ContextHolder;
pub use work::{BackgroundWorkContext, WorkContext, DEFAULT_BUFFER_SIZE};
