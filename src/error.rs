//! Error types for the ctxtree cancellation tree.

use thiserror::Error;

/// Terminal reason carried by a cancelled context.
///
/// Descendants that inherit a cancellation report their ancestor's reason
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CancelError {
    /// The cancel function was invoked.
    #[error("context canceled")]
    Canceled,

    /// A deadline timer fired before anyone cancelled explicitly.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl CancelError {
    pub fn as_str(self) -> &'static str {
        match self {
            CancelError::Canceled => "canceled",
            CancelError::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

/// Errors from the ambient layers (configuration, logging, timer startup).
#[derive(Debug, Error)]
pub enum CtxTreeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Timer service error: {0}")]
    Timer(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CtxTreeError {
    fn from(err: config::ConfigError) -> Self {
        CtxTreeError::Config(err.to_string())
    }
}
