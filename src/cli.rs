//! CLI domain: parse, route, output and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

pub mod exit;
mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_diff_json, format_diff_text, format_errors_json, format_errors_text,
    format_generate_summary, format_match_json, format_match_text, format_node_listing_json,
    format_node_listing_text, format_outcome_json, format_outcome_text, format_tree_json,
};
pub use route::{CommandOutput, RunContext};
