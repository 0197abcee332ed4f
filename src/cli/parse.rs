//! CLI parse: clap types for workctx. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RunConfig;

/// workctx - ambient work-context propagation and retention probe
#[derive(Parser)]
#[command(name = "workctx")]
#[command(about = "Launch bounded background units that carry ambient work contexts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (for .workctx/config.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the units of work and report buffer retention
    Run(RunArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Overrides for the `[run]` configuration section
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Number of units of work
    #[arg(long)]
    pub units: Option<usize>,

    /// Admission gate capacity (0 disables the gate)
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Bytes allocated per work context
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Simulated I/O delay per unit in milliseconds
    #[arg(long)]
    pub io_delay_ms: Option<u64>,

    /// Dispose each unit's context when it completes
    #[arg(long)]
    pub dispose: bool,

    /// Skip the stdin pauses between inspection phases
    #[arg(long)]
    pub no_pause: bool,

    /// Runtime worker threads
    #[arg(long)]
    pub worker_threads: Option<usize>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Fold CLI overrides into a run configuration.
    pub fn apply_to(&self, config: &mut RunConfig) {
        if let Some(units) = self.units {
            config.units = units;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent = max_concurrent;
        }
        if let Some(buffer_size) = self.buffer_size {
            config.buffer_size = buffer_size;
        }
        if let Some(io_delay_ms) = self.io_delay_ms {
            config.io_delay_ms = io_delay_ms;
        }
        if self.dispose {
            config.dispose_on_complete = true;
        }
        if self.no_pause {
            config.pause = false;
        }
        if self.worker_threads.is_some() {
            config.worker_threads = self.worker_threads;
        }
    }
}
