//! Error types for policy configuration and rule sources.

use thiserror::Error;

/// Errors surfaced while building or reloading a policy engine.
///
/// Everything here is configuration-time: per-request evaluation paths are
/// total and report denial through decision values instead.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The rule set could not be parsed into policy rules.
    #[error("invalid policy rule set: {0}")]
    InvalidRuleSet(String),
    /// A rule failed structural or semantic validation.
    #[error("invalid policy rule `{rule}`: {reason}")]
    InvalidRule {
        /// Label of the offending rule.
        rule: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
    /// A rule's allow expression cannot be translated into a row filter.
    #[error("rule `{rule}` has an allow expression with no row-filter translation: {reason}")]
    UnsupportedAllowShape {
        /// Label of the offending rule.
        rule: String,
        /// Which part of the expression is not translatable.
        reason: &'static str,
    },
    /// A rule source backend reported an error.
    #[error("policy backend failure: {reason}")]
    Backend {
        /// Human-readable explanation for logging and operators.
        reason: String,
    },
}

impl PolicyError {
    /// Helper to construct backend errors from string-like values.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
