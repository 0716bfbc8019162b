//! CLI domain: parse, route, and presentation for the `ctxtree` binary.
//! Scenarios live in `demo`; this layer only maps flags onto them.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, WorkerArgs};
pub use presentation::{format_cancel_report, format_timeout_report, format_values_report};
pub use route::RunContext;
