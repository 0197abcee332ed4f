//! CLI output: error mapping and run summaries.

use crate::error::ProbeError;
use crate::probe::ProbeOutcome;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &ProbeError) -> String {
    match e {
        ProbeError::ConfigError(msg) => format!("Configuration error: {}", msg),
        other => other.to_string(),
    }
}

const MIB: f64 = 1024.0 * 1024.0;

/// Human-readable summary of a probe run.
pub fn format_summary_text(outcome: &ProbeOutcome) -> String {
    let run = &outcome.run;
    let gate = run
        .max_concurrent
        .map(|k| k.to_string())
        .unwrap_or_else(|| "unbounded".to_string());

    let mut lines = vec![
        format!("Units completed:      {}/{}", run.completed, run.units),
        format!("Admission gate:       {}", gate),
        format!("Peak in flight:       {}", run.peak_in_flight),
        format!("Isolation violations: {}", run.isolation_violations),
        format!("Elapsed:              {} ms", run.elapsed.as_millis()),
        format!(
            "Context sets/disposes: {}/{}",
            outcome.accessor.sets, outcome.accessor.disposes
        ),
    ];
    for report in &outcome.retention {
        lines.push(format!(
            "[{}] live buffers: {} ({:.1} MiB, peak {:.1} MiB), top-level context: {}",
            report.phase,
            report.live_buffers,
            report.live_bytes as f64 / MIB,
            report.peak_bytes as f64 / MIB,
            if report.top_level_context { "set" } else { "none" }
        ));
    }
    lines.join("\n")
}

pub fn format_summary_json(outcome: &ProbeOutcome) -> Result<String, ProbeError> {
    Ok(serde_json::to_string_pretty(outcome)?)
}
