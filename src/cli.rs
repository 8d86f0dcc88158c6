//! CLI domain: parse, route, output, and presentation only.
//! No pipeline logic; the route table hands off to the engine and formatters.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_config_toml, format_fingerprint_json, format_fingerprint_text, format_report_json,
    format_section_heading, format_status_text, format_sync_text, FingerprintOutput,
};
pub use route::RunContext;
