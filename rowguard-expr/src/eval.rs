//! Evaluator seam and the bundled structural interpreter.

use serde_json::Value;

use crate::context::ExpressionContext;
use crate::error::{EvalError, EvalResult};
use crate::node::{CompareOp, Expression, LogicOp};

/// Default nesting bound applied by [`DefaultEvaluator`].
const DEFAULT_MAX_DEPTH: usize = 64;

/// Trait implemented by expression evaluation backends.
///
/// Implementations must be deterministic per input and side-effect free; the
/// policy engine relies on both to keep its decisions reproducible. Errors are
/// reported, never panicked, so the engine can treat a failing rule as
/// non-matching.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates the expression against the supplied context.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] when the backend cannot produce a value.
    fn evaluate(&self, expression: &Expression, context: &ExpressionContext) -> EvalResult<Value>;
}

/// Coerces an evaluation result to a boolean.
///
/// Null, `false`, zero, and the empty string are falsy; every other value,
/// including empty arrays and objects, is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Structural interpreter over the closed expression grammar.
///
/// Depth-bounded so a pathological tree surfaces as an evaluation error
/// rather than unbounded recursion.
#[derive(Debug, Clone, Copy)]
pub struct DefaultEvaluator {
    max_depth: usize,
}

impl DefaultEvaluator {
    /// Creates an evaluator with the supplied nesting bound.
    #[must_use]
    pub const fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Returns the configured nesting bound.
    #[must_use]
    pub const fn max_depth(self) -> usize {
        self.max_depth
    }

    fn eval_node(
        &self,
        expression: &Expression,
        context: &ExpressionContext,
        depth: usize,
    ) -> EvalResult<Value> {
        if depth > self.max_depth {
            return Err(EvalError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        match expression {
            Expression::Literal { value } => Ok(value.clone()),
            Expression::Field { path } => Ok(context.resolve(path)),
            Expression::Condition {
                op: CompareOp::Eq,
                left,
                right,
            } => {
                let left = self.eval_node(left, context, depth + 1)?;
                let right = self.eval_node(right, context, depth + 1)?;
                Ok(Value::Bool(left == right))
            }
            Expression::Operation { op, args } => self.eval_operation(*op, args, context, depth),
            Expression::Permission { name } => {
                let granted = context
                    .resolve("user.permissions")
                    .as_array()
                    .is_some_and(|permissions| {
                        permissions.iter().any(|entry| entry.as_str() == Some(name))
                    });
                Ok(Value::Bool(granted))
            }
        }
    }

    fn eval_operation(
        &self,
        op: LogicOp,
        args: &[Expression],
        context: &ExpressionContext,
        depth: usize,
    ) -> EvalResult<Value> {
        // Short-circuits left to right, like the boolean connectives it models.
        match op {
            LogicOp::And => {
                for arg in args {
                    if !is_truthy(&self.eval_node(arg, context, depth + 1)?) {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            LogicOp::Or => {
                for arg in args {
                    if is_truthy(&self.eval_node(arg, context, depth + 1)?) {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
        }
    }
}

impl Default for DefaultEvaluator {
    fn default() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }
}

impl ExpressionEvaluator for DefaultEvaluator {
    fn evaluate(&self, expression: &Expression, context: &ExpressionContext) -> EvalResult<Value> {
        self.eval_node(expression, context, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(data: Value, user: Value) -> ExpressionContext {
        ExpressionContext::new()
            .with_data(data.as_object().cloned().expect("data object"))
            .with_user(user.as_object().cloned().expect("user object"))
    }

    #[test]
    fn equality_compares_resolved_values() {
        let ctx = context(json!({"uploadedBy": "u1"}), json!({"id": "u1"}));
        let evaluator = DefaultEvaluator::default();

        let own = Expression::eq(Expression::field("uploadedBy"), Expression::user_id());
        assert_eq!(evaluator.evaluate(&own, &ctx).unwrap(), json!(true));

        let other = Expression::eq(Expression::field("uploadedBy"), Expression::literal("u2"));
        assert_eq!(evaluator.evaluate(&other, &ctx).unwrap(), json!(false));
    }

    #[test]
    fn disjunction_short_circuits() {
        let ctx = context(json!({"isPublic": true}), json!({"id": "u1"}));
        let evaluator = DefaultEvaluator::default();

        let expr = Expression::or([
            Expression::eq(Expression::field("isPublic"), Expression::literal(true)),
            Expression::eq(Expression::field("uploadedBy"), Expression::user_id()),
        ]);

        assert_eq!(evaluator.evaluate(&expr, &ctx).unwrap(), json!(true));
    }

    #[test]
    fn conjunction_requires_every_arm() {
        let ctx = context(json!({"isPublic": true, "status": "draft"}), json!({}));
        let evaluator = DefaultEvaluator::default();

        let expr = Expression::and([
            Expression::eq(Expression::field("isPublic"), Expression::literal(true)),
            Expression::eq(Expression::field("status"), Expression::literal("live")),
        ]);

        assert_eq!(evaluator.evaluate(&expr, &ctx).unwrap(), json!(false));
    }

    #[test]
    fn permission_gate_checks_user_grants() {
        let ctx = context(json!({}), json!({"id": "u1", "permissions": ["tracks:purge"]}));
        let evaluator = DefaultEvaluator::default();

        let granted = Expression::permission("tracks:purge");
        assert_eq!(evaluator.evaluate(&granted, &ctx).unwrap(), json!(true));

        let missing = Expression::permission("tracks:publish");
        assert_eq!(evaluator.evaluate(&missing, &ctx).unwrap(), json!(false));
    }

    #[test]
    fn missing_fields_compare_like_null() {
        let ctx = context(json!({}), json!({"id": "u1"}));
        let evaluator = DefaultEvaluator::default();

        let expr = Expression::eq(Expression::field("uploadedBy"), Expression::user_id());
        assert_eq!(evaluator.evaluate(&expr, &ctx).unwrap(), json!(false));

        let both_null = Expression::eq(Expression::field("a"), Expression::field("b"));
        assert_eq!(evaluator.evaluate(&both_null, &ctx).unwrap(), json!(true));
    }

    #[test]
    fn depth_bound_rejects_pathological_trees() {
        let mut expr = Expression::literal(true);
        for _ in 0..200 {
            expr = Expression::and([expr]);
        }

        let evaluator = DefaultEvaluator::default();
        let err = evaluator
            .evaluate(&expr, &ExpressionContext::new())
            .expect_err("should exceed depth");
        assert!(matches!(err, EvalError::DepthExceeded { .. }));
    }

    #[test]
    fn truthiness_follows_loose_coercion() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(1.5)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }
}
