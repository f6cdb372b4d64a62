//! Atomic engine replacement and remote rule sources.

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::info;

use crate::engine::PolicyEngine;
use crate::error::PolicyResult;
use crate::rule::PolicyRule;

/// Trait implemented by backends that supply policy rule sets.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Fetches the current rule set from the backend.
    async fn load_rules(&self) -> PolicyResult<Vec<PolicyRule>>;
}

/// Shared handle over an immutable [`PolicyEngine`].
///
/// The engine itself never mutates; a reload builds and validates a fresh
/// engine and swaps the shared reference atomically. Readers clone the `Arc`
/// and evaluate against a consistent rule set without holding any lock.
pub struct SharedPolicyEngine {
    inner: RwLock<Arc<PolicyEngine>>,
}

impl SharedPolicyEngine {
    /// Wraps an engine in a swappable handle.
    #[must_use]
    pub fn new(engine: PolicyEngine) -> Self {
        Self {
            inner: RwLock::new(Arc::new(engine)),
        }
    }

    /// Returns the current engine.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn load(&self) -> Arc<PolicyEngine> {
        Arc::clone(&self.inner.read().expect("policy engine poisoned"))
    }

    /// Replaces the current engine.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    pub fn swap(&self, engine: PolicyEngine) {
        let mut guard = self.inner.write().expect("policy engine poisoned");
        *guard = Arc::new(engine);
    }

    /// Validates a new rule set and swaps it in, keeping the current
    /// evaluator. On error the running engine stays in place.
    ///
    /// # Errors
    ///
    /// Returns the validation error from [`PolicyEngine::with_evaluator`].
    pub fn reload(&self, rules: Vec<PolicyRule>) -> PolicyResult<()> {
        let evaluator = self.load().evaluator();
        let engine = PolicyEngine::with_evaluator(rules, evaluator)?;
        let count = engine.rules().len();
        self.swap(engine);
        info!(rules = count, "policy rule set reloaded");
        Ok(())
    }

    /// Fetches a rule set from the supplied source and swaps it in.
    ///
    /// # Errors
    ///
    /// Returns the source's fetch error or the rule validation error; in
    /// either case the running engine stays in place.
    pub async fn reload_from(&self, source: &dyn RuleSource) -> PolicyResult<()> {
        let rules = source.load_rules().await?;
        self.reload(rules)
    }
}

impl fmt::Debug for SharedPolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPolicyEngine").finish_non_exhaustive()
    }
}
