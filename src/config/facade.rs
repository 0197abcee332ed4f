//! Config loading entry points.

use super::{merge, sources, ProbeConfig};
use config::{ConfigError, File};
use std::path::Path;
use tracing::debug;

/// Loads [`ProbeConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then global file, workspace file and environment.
    pub fn load(workspace_root: &Path) -> Result<ProbeConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::add_all(builder, workspace_root)?;
        let config: ProbeConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Defaults overlaid with a single explicit file.
    pub fn load_from_file(path: &Path) -> Result<ProbeConfig, ConfigError> {
        merge::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }
}
