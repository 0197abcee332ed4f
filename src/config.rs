//! Configuration System
//!
//! Layered configuration for probe runs: merge-policy defaults, the global config
//! file, the workspace config file, then `WORKCTX_*` environment overrides.

use crate::context::DEFAULT_BUFFER_SIZE;
use crate::error::ProbeError;
use crate::launcher::DEFAULT_MAX_CONCURRENT_UNITS;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::{global_config_path, workspace_config_path};

/// Largest buffer a single context may allocate (1 GiB)
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024 * 1024;

/// Largest admission gate the runtime semaphore can hold
pub const MAX_CONCURRENT: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Launcher and work unit settings
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for one probe run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of units of work to launch
    #[serde(default = "default_units")]
    pub units: usize,

    /// Admission gate capacity; 0 disables the gate
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Bytes allocated per work context
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Simulated I/O delay inside each unit (milliseconds)
    #[serde(default = "default_io_delay_ms")]
    pub io_delay_ms: u64,

    /// Dispose the ambient context when a unit finishes
    #[serde(default)]
    pub dispose_on_complete: bool,

    /// Block on stdin between inspection phases
    #[serde(default = "default_pause")]
    pub pause: bool,

    /// Runtime worker threads (defaults to the number of cores)
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

fn default_units() -> usize {
    2000
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT_UNITS
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_io_delay_ms() -> u64 {
    1000
}

fn default_pause() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            units: default_units(),
            max_concurrent: default_max_concurrent(),
            buffer_size: default_buffer_size(),
            io_delay_ms: default_io_delay_ms(),
            dispose_on_complete: false,
            pause: default_pause(),
            worker_threads: None,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Run(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Run(msg) => write!(f, "Run: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RunConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.units == 0 {
            errors.push("units must be greater than 0".to_string());
        }
        if self.max_concurrent > MAX_CONCURRENT {
            errors.push(format!(
                "max_concurrent {} exceeds the maximum of {}",
                self.max_concurrent, MAX_CONCURRENT
            ));
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            errors.push(format!(
                "buffer_size {} exceeds the maximum of {} bytes",
                self.buffer_size, MAX_BUFFER_SIZE
            ));
        }
        if self.worker_threads == Some(0) {
            errors.push("worker_threads must be greater than 0".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ProbeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(run_errors) = self.run.validate() {
            errors.extend(run_errors.into_iter().map(ValidationError::Run));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding all failures into one error.
    pub fn ensure_valid(&self) -> Result<(), ProbeError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ProbeError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
