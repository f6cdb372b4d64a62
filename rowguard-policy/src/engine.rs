//! Policy engine core: rule matching, access decisions, filter composition.

use std::fmt;
use std::sync::Arc;

use rowguard_expr::{is_truthy, DefaultEvaluator, ExpressionContext, ExpressionEvaluator};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::contracts::PolicyContext;
use crate::decision::{AccessDecision, AllowedFields};
use crate::error::{PolicyError, PolicyResult};
use crate::fields::filter_fields;
use crate::row_filter::{extract_row_filter, RowFilter};
use crate::rule::{CrudAction, PolicyRule};

/// Single source of truth for "is this action allowed, and under what
/// constraints".
///
/// The rule set is validated once at construction and immutable afterwards;
/// every per-request method is a pure function of the rules and the supplied
/// context, so one engine can serve concurrent callers without locking. For
/// rule reloads, construct a new engine and swap it in via
/// [`crate::SharedPolicyEngine`].
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl PolicyEngine {
    /// Builds an engine over the supplied rules with the bundled evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidRule`] or
    /// [`PolicyError::UnsupportedAllowShape`] when any rule fails validation.
    /// A misconfigured rule set is a startup-time fatal: the host must not
    /// serve requests with a partially-validated engine.
    pub fn new(rules: Vec<PolicyRule>) -> PolicyResult<Self> {
        Self::with_evaluator(rules, Arc::new(DefaultEvaluator::default()))
    }

    /// Builds an engine that delegates truth-evaluation to the supplied
    /// backend.
    ///
    /// # Errors
    ///
    /// Same as [`PolicyEngine::new`].
    pub fn with_evaluator(
        rules: Vec<PolicyRule>,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> PolicyResult<Self> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules, evaluator })
    }

    /// Parses a JSON rule set and builds an engine from it.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidRuleSet`] when the JSON does not decode
    /// into rules, or a validation error as in [`PolicyEngine::new`].
    pub fn from_json(raw: &str) -> PolicyResult<Self> {
        let rules: Vec<PolicyRule> =
            serde_json::from_str(raw).map_err(|error| PolicyError::InvalidRuleSet(error.to_string()))?;
        Self::new(rules)
    }

    /// Returns the validated rule set.
    #[must_use]
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub(crate) fn evaluator(&self) -> Arc<dyn ExpressionEvaluator> {
        Arc::clone(&self.evaluator)
    }

    fn matching_rules<'a>(
        &'a self,
        model: &'a str,
        action: CrudAction,
    ) -> impl Iterator<Item = &'a PolicyRule> {
        self.rules
            .iter()
            .filter(move |rule| rule.matches(model, action))
    }

    fn expression_context(context: &PolicyContext) -> ExpressionContext {
        let mut globals = Map::new();
        globals.insert("model".into(), Value::String(context.model().into()));
        globals.insert(
            "action".into(),
            Value::String(context.action().as_str().into()),
        );
        globals.insert(
            "where".into(),
            context.where_filter().cloned().unwrap_or(Value::Null),
        );

        ExpressionContext::new()
            .with_data(context.data().cloned().unwrap_or_default())
            .with_user(context.principal().to_map())
            .with_globals(globals)
    }

    /// Evaluates the context against the rule set and returns the full
    /// decision.
    ///
    /// Rules matching on (model, action) are tried in list order; the first
    /// whose allow expression evaluates truthy grants access, and only that
    /// rule's row filter and field grants populate the decision. Access is
    /// OR'd across rules: one grant suffices. A rule whose evaluation fails is
    /// logged and treated as non-matching: an evaluation error is never an
    /// implicit grant, and never an exception to the caller. No matching rule
    /// at all is a denial; the engine never defaults to allow.
    #[must_use]
    pub fn evaluate(&self, context: &PolicyContext) -> AccessDecision {
        let model = context.model();
        let action = context.action();

        let matching: Vec<&PolicyRule> = self.matching_rules(model, action).collect();
        if matching.is_empty() {
            return AccessDecision::denied(format!("No policy defined for {model}.{action}"));
        }

        let expression_context = Self::expression_context(context);
        for rule in matching {
            let Some(allow) = rule.allow() else {
                continue;
            };
            match self.evaluator.evaluate(allow, &expression_context) {
                Ok(value) if is_truthy(&value) => {
                    debug!(rule = %rule.label(), model, action = %action, "policy rule granted access");
                    return AccessDecision::granted(
                        extract_row_filter(allow, context.principal()),
                        filter_fields(rule.fields()),
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(
                        rule = %rule.label(),
                        model,
                        action = %action,
                        %error,
                        "policy expression evaluation failed; treating rule as non-matching"
                    );
                }
            }
        }

        debug!(model, action = %action, "no policy rule granted access");
        AccessDecision::denied(format!("Access denied by policy for {model}.{action}"))
    }

    /// Returns whether the context's action is permitted.
    #[must_use]
    pub fn check_access(&self, context: &PolicyContext) -> bool {
        self.evaluate(context).is_allowed()
    }

    /// Computes the row filter a query for this context must run under.
    ///
    /// When no matching rule carries an allow expression the result is the
    /// impossible filter: "no policy" must filter out all rows, not admit
    /// them. Otherwise the first such rule's filter applies, conjoined with
    /// the caller's existing `where` so it is never dropped. Only the first
    /// rule is consulted even when several match, unlike the access check's
    /// OR across rules; callers with overlapping grants should keep their
    /// first matching rule the widest.
    #[must_use]
    pub fn apply_row_filters(&self, context: &PolicyContext) -> RowFilter {
        let policy_filter = self
            .matching_rules(context.model(), context.action())
            .find_map(|rule| {
                rule.allow()
                    .map(|allow| extract_row_filter(allow, context.principal()))
            });

        let Some(policy_filter) = policy_filter else {
            return RowFilter::never();
        };

        match context.where_filter() {
            Some(existing) => RowFilter::Raw(existing.clone()).and(policy_filter),
            None => policy_filter,
        }
    }

    /// Returns the field grants for this context.
    ///
    /// Fail-closed: no matching rule grants no fields. Otherwise the first
    /// matching rule's field configuration is resolved via
    /// [`crate::filter_fields`].
    #[must_use]
    pub fn allowed_fields(&self, context: &PolicyContext) -> AllowedFields {
        self.matching_rules(context.model(), context.action())
            .next()
            .map_or_else(AllowedFields::none, |rule| filter_fields(rule.fields()))
    }
}

impl fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}
