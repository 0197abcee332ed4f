//! Configuration file and environment sources.

mod global_file;
mod workspace_file;

pub use global_file::global_config_path;
pub use workspace_file::workspace_config_path;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment};
use std::path::Path;

/// Environment variable prefix, e.g. `WORKCTX_RUN__UNITS=50`
pub const ENV_PREFIX: &str = "WORKCTX";

/// Add all sources in precedence order: global file, workspace file, environment.
pub fn add_all(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = global_file::add_to_builder(builder)?;
    let builder = workspace_file::add_to_builder(builder, workspace_root)?;
    Ok(add_environment(builder))
}

pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
