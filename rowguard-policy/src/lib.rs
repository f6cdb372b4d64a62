//! Declarative authorization with row- and field-level security.
//!
//! A [`PolicyEngine`] owns an immutable, validated rule set and decides, for a
//! (principal, model, action) triple, whether an operation is permitted, which
//! set-level row filter the caller's query must run under, and which fields
//! may be read or written. The engine is sound by default: no matching rule
//! means denial and the impossible row filter, never an open door. Per-request
//! paths are total, so evaluation failures demote a rule to non-matching
//! instead of escaping to the caller.

#![warn(missing_docs, clippy::pedantic)]

mod contracts;
mod decision;
mod engine;
mod error;
mod fields;
mod reload;
mod row_filter;
mod rule;

/// Request contracts supplied per authorization check.
pub use contracts::{PolicyContext, Principal};
/// Decision types returned by the engine.
pub use decision::{AccessDecision, AllowedFields, FIELD_WILDCARD};
/// The policy engine core.
pub use engine::PolicyEngine;
/// Error type and result alias for configuration-time failures.
pub use error::{PolicyError, PolicyResult};
/// Field grant resolution and payload shaping utilities.
pub use fields::{filter_data_fields, filter_fields};
/// Atomic engine replacement and remote rule sources.
pub use reload::{RuleSource, SharedPolicyEngine};
/// Row filters and the structural expression extractor.
pub use row_filter::{extract_row_filter, RowFilter};
/// Rule model and field grant configuration.
pub use rule::{CrudAction, FieldRules, PolicyRule};
