//! Memory retention inspection.
//!
//! Buffer bytes are counted as they are allocated and released, so each phase of
//! a run can report how much per-context state is still reachable.

use crate::context::WorkContextAccessor;
use crate::error::ProbeError;
use serde::Serialize;
use std::io::BufRead;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Live buffer accounting shared by every context of a provider
#[derive(Debug, Default)]
pub struct BufferGauge {
    live_bytes: AtomicUsize,
    live_buffers: AtomicUsize,
    peak_bytes: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GaugeSnapshot {
    pub live_bytes: usize,
    pub live_buffers: usize,
    pub peak_bytes: usize,
}

impl BufferGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bytes: usize) {
        let live = self.live_bytes.fetch_add(bytes, Ordering::AcqRel) + bytes;
        self.live_buffers.fetch_add(1, Ordering::AcqRel);
        self.peak_bytes.fetch_max(live, Ordering::AcqRel);
    }

    pub fn release(&self, bytes: usize) {
        self.live_bytes.fetch_sub(bytes, Ordering::AcqRel);
        self.live_buffers.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn snapshot(&self) -> GaugeSnapshot {
        GaugeSnapshot {
            live_bytes: self.live_bytes.load(Ordering::Acquire),
            live_buffers: self.live_buffers.load(Ordering::Acquire),
            peak_bytes: self.peak_bytes.load(Ordering::Acquire),
        }
    }
}

/// Retention observed at one phase of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    pub phase: String,
    pub live_bytes: usize,
    pub live_buffers: usize,
    pub peak_bytes: usize,
    /// Whether a context is visible at the caller's own call-tree level
    pub top_level_context: bool,
}

impl RetentionReport {
    pub fn capture(phase: &str, gauge: &BufferGauge, accessor: &WorkContextAccessor) -> Self {
        let snapshot = gauge.snapshot();
        let report = Self {
            phase: phase.to_string(),
            live_bytes: snapshot.live_bytes,
            live_buffers: snapshot.live_buffers,
            peak_bytes: snapshot.peak_bytes,
            top_level_context: accessor.context().is_some(),
        };
        info!(
            phase = %report.phase,
            live_bytes = report.live_bytes,
            live_buffers = report.live_buffers,
            peak_bytes = report.peak_bytes,
            top_level_context = report.top_level_context,
            "Retention report"
        );
        report
    }
}

/// Block until a line is read (or EOF), so memory can be inspected externally.
pub fn pause_for_inspection<R: BufRead>(label: &str, reader: &mut R) -> Result<(), ProbeError> {
    info!(phase = %label, "Paused for inspection; press Enter to continue");
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(())
}
