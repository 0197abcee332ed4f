//! Merge rules: defaults, override order, conflict handling.

use crate::context::DEFAULT_BUFFER_SIZE;
use crate::launcher::DEFAULT_MAX_CONCURRENT_UNITS;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("run.units", 2000_i64)?
        .set_default("run.max_concurrent", DEFAULT_MAX_CONCURRENT_UNITS as i64)?
        .set_default("run.buffer_size", DEFAULT_BUFFER_SIZE as i64)?
        .set_default("run.io_delay_ms", 1000_i64)?
        .set_default("run.dispose_on_complete", false)?
        .set_default("run.pause", true)?
        .set_default("logging.level", "info")
}
