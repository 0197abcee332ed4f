//! CLI domain: parse, route and output only.

mod output;
mod parse;
mod route;

pub use output::{format_summary_json, format_summary_text, map_error};
pub use parse::{Cli, Commands, RunArgs};
pub use route::RunContext;
