//! Work unit logic and console output.

use crate::context::WorkContextAccessor;
use crate::error::ProbeError;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Destination for per-unit output lines
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str) -> Result<(), ProbeError>;
}

/// Writes lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LineSink for ConsoleSink {
    fn write_line(&self, line: &str) -> Result<(), ProbeError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", line)?;
        Ok(())
    }
}

/// Collects lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) -> Result<(), ProbeError> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}

/// Numeric id of the worker thread currently polling the task.
pub fn worker_thread_id() -> String {
    thread_id_digits(&format!("{:?}", std::thread::current().id()))
}

/// Strip `ThreadId(..)`; anything other than a bare number is kept verbatim.
fn thread_id_digits(raw: &str) -> String {
    let trimmed = raw.trim_start_matches("ThreadId(").trim_end_matches(')');
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        trimmed.to_string()
    } else {
        raw.to_string()
    }
}

/// Format one output line: `ThreadID:<thread-id>-<context-id>`
pub fn format_line(thread_id: &str, context_id: &str) -> String {
    format!("ThreadID:{}-{}", thread_id, context_id)
}

/// Scoped collaborator that reads the ambient context and simulates I/O
pub struct WorkUnit {
    accessor: Arc<WorkContextAccessor>,
    sink: Arc<dyn LineSink>,
    io_delay: Duration,
}

impl WorkUnit {
    pub fn new(
        accessor: Arc<WorkContextAccessor>,
        sink: Arc<dyn LineSink>,
        io_delay: Duration,
    ) -> Self {
        Self {
            accessor,
            sink,
            io_delay,
        }
    }

    /// Emit the correlation line, then suspend for the I/O delay.
    ///
    /// Returns the context id observed before suspending (empty when none).
    pub async fn process(&self) -> Result<String, ProbeError> {
        let context_id = match self.accessor.context() {
            Some(context) => context.id().to_string(),
            None => {
                warn!("Work unit running without an ambient work context");
                String::new()
            }
        };

        let thread_id = worker_thread_id();
        self.sink.write_line(&format_line(&thread_id, &context_id))?;
        debug!(thread_id = %thread_id, context_id = %context_id, "Work unit processing");

        if !self.io_delay.is_zero() {
            tokio::time::sleep(self.io_delay).await;
        }
        Ok(context_id)
    }
}
