//! Row- and field-level security policy engine facade.
//!
//! Depend on this crate via `cargo add rowguard`. It bundles the internal
//! crates behind feature flags so downstream users can take just the
//! expression grammar or the full engine as needed.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export the expression grammar and evaluation seam.
pub use rowguard_expr as expr;

/// Policy rules, engine, and filters (enabled by the `policy` feature).
#[cfg(feature = "policy")]
pub use rowguard_policy as policy;
