//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::CtxTreeError;

/// Map errors to a single line for stderr.
pub fn map_error(e: &CtxTreeError) -> String {
    match e {
        CtxTreeError::Config(msg) => format!("config: {}", msg),
        other => other.to_string(),
    }
}
