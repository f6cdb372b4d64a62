//! Error types for expression evaluation.

use thiserror::Error;

/// Errors surfaced by expression evaluators.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Expression nesting exceeded the evaluator's depth bound.
    #[error("expression nesting exceeds {limit} levels")]
    DepthExceeded {
        /// The configured depth limit.
        limit: usize,
    },
    /// The evaluator does not support the supplied expression shape.
    #[error("unsupported expression: {0}")]
    Unsupported(&'static str),
    /// An external evaluation backend reported an error.
    #[error("evaluation backend failure: {reason}")]
    Backend {
        /// Human-readable explanation for logging and operators.
        reason: String,
    },
}

impl EvalError {
    /// Helper to construct backend errors from string-like values.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Result alias for evaluation operations.
pub type EvalResult<T> = Result<T, EvalError>;
