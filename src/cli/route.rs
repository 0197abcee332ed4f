//! CLI route: single route table and run context.

use crate::cli::output::{format_summary_json, format_summary_text};
use crate::cli::parse::{Commands, RunArgs};
use crate::config::{ConfigLoader, ProbeConfig, RunConfig};
use crate::error::ProbeError;
use crate::probe::run_probe;
use crate::process::ConsoleSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Runtime context for CLI execution: workspace and effective configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: ProbeConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ProbeError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn from_config(workspace_root: PathBuf, config: ProbeConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run configuration with CLI overrides applied and validated.
    pub fn effective_run_config(&self, args: &RunArgs) -> Result<RunConfig, ProbeError> {
        let mut config = self.config.clone();
        args.apply_to(&mut config.run);
        config.ensure_valid()?;
        Ok(config.run)
    }

    /// Execute a command and return its output text.
    pub fn execute(&self, command: &Commands) -> Result<String, ProbeError> {
        match command {
            Commands::Run(args) => self.handle_run(args),
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| ProbeError::ConfigError(format!("Failed to render config: {}", e))),
        }
    }

    fn handle_run(&self, args: &RunArgs) -> Result<String, ProbeError> {
        let run_config = self.effective_run_config(args)?;
        info!(
            workspace = %self.workspace_root.display(),
            units = run_config.units,
            max_concurrent = run_config.max_concurrent,
            "Starting probe run"
        );

        let mut builder = tokio::runtime::Builder::new_multi_thread();
        if let Some(threads) = run_config.worker_threads {
            builder.worker_threads(threads);
        }
        let runtime = builder.enable_all().build()?;

        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let outcome = runtime.block_on(run_probe(run_config, Arc::new(ConsoleSink), &mut input))?;

        if args.json {
            format_summary_json(&outcome)
        } else {
            Ok(format_summary_text(&outcome))
        }
    }
}
