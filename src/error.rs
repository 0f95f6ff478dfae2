//! Failure classes for canvas operations.
//!
//! Most errors travel as `anyhow::Error` with context attached at each git or
//! filesystem boundary. The classes below are attached as the root cause where
//! the caller needs to tell them apart (the CLI maps them to exit codes).

use thiserror::Error;

/// Classified failure of a single generate / fetch / delete operation.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Input rejected before any external step ran.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Clone, push or another external git step failed or timed out.
    ///
    /// The message carries git's own stderr, trimmed.
    #[error("{0}")]
    Transport(String),

    /// A history rewrite finished but its result could not be confirmed.
    #[error("rewrite could not be verified: {0}")]
    Verification(String),
}

impl CanvasError {
    pub fn validation(message: impl Into<String>) -> Self {
        CanvasError::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        CanvasError::Transport(message.into())
    }

    pub fn verification(message: impl Into<String>) -> Self {
        CanvasError::Verification(message.into())
    }

    /// Process exit code used by the CLI for this class.
    pub fn exit_code(&self) -> i32 {
        match self {
            CanvasError::Validation(_) => 2,
            CanvasError::Transport(_) => 3,
            CanvasError::Verification(_) => 4,
        }
    }
}

/// Find the classified cause anywhere in an error chain.
pub fn classify(err: &anyhow::Error) -> Option<&CanvasError> {
    err.chain().find_map(|cause| cause.downcast_ref::<CanvasError>())
}

/// Exit code for an arbitrary error; unclassified errors exit with 1.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    classify(err).map_or(1, CanvasError::exit_code)
}
