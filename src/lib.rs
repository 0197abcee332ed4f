//! workctx: Ambient Work Context Probe
//!
//! Launches bounded pools of background units, each installing a large work
//! context into a task-local ambient slot, and measures how long those contexts
//! stay reachable when they are or are not explicitly disposed.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod inspection;
pub mod launcher;
pub mod logging;
pub mod probe;
pub mod process;
pub mod scope;
