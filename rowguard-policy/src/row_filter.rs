//! ORM-neutral row filters and the structural expression extractor.

use rowguard_expr::{CompareOp, Expression, LogicOp, USER_ID_PATH};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::contracts::Principal;

const NEVER_FIELD: &str = "id";
const NEVER_VALUE: &str = "__never__";

/// A set-level query constraint a downstream data layer can embed into its
/// `where` clause.
///
/// Serializes to the recursive `{field: value} | {"AND": [..]} | {"OR": [..]}`
/// object shape, so it drops into common ORM filter syntax without this crate
/// depending on any ORM.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFilter {
    /// No constraint; matches every row.
    Empty,
    /// A single field must equal the supplied value.
    Eq {
        /// Dotted field path on the queried model.
        field: String,
        /// Required value.
        value: Value,
    },
    /// Every nested filter must match.
    And(Vec<RowFilter>),
    /// At least one nested filter must match.
    Or(Vec<RowFilter>),
    /// A caller-supplied filter carried through verbatim.
    Raw(Value),
}

impl RowFilter {
    /// Builds an equality constraint.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns the deliberately impossible filter used when no policy covers
    /// a query: it must filter out all rows, never admit them.
    #[must_use]
    pub fn never() -> Self {
        Self::eq(NEVER_FIELD, NEVER_VALUE)
    }

    /// Returns `true` when the filter constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Conjoins two filters, eliding empty sides instead of wrapping them.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Empty, other) => other,
            (this, Self::Empty) => this,
            (this, other) => Self::And(vec![this, other]),
        }
    }

    /// Renders the filter as its JSON object shape.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Empty => Value::Object(Map::new()),
            Self::Eq { field, value } => {
                let mut object = Map::new();
                object.insert(field.clone(), value.clone());
                Value::Object(object)
            }
            Self::And(parts) => Self::connective("AND", parts),
            Self::Or(parts) => Self::connective("OR", parts),
            Self::Raw(value) => value.clone(),
        }
    }

    fn connective(key: &str, parts: &[Self]) -> Value {
        let mut object = Map::new();
        object.insert(
            key.into(),
            Value::Array(parts.iter().map(Self::to_value).collect()),
        );
        Value::Object(object)
    }
}

impl Serialize for RowFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Translates an allow expression into a row filter by structural recognition.
///
/// Works without an evaluator so the result attaches to a set query instead of
/// being re-checked per fetched row. Total and side-effect free: shapes with
/// no row meaning yield [`RowFilter::Empty`]. Validated rule sets never reach
/// the unrecognized branch (see [`check_extractable`]); the warning is kept as
/// defense in depth for expressions that bypassed validation.
#[must_use]
pub fn extract_row_filter(expression: &Expression, principal: &Principal) -> RowFilter {
    match expression {
        Expression::Condition {
            op: CompareOp::Eq,
            left,
            right,
        } => extract_condition(left, right, principal),
        Expression::Operation { op, args } => {
            let mut parts: Vec<RowFilter> = args
                .iter()
                .map(|arg| extract_row_filter(arg, principal))
                .filter(|part| !part.is_empty())
                .collect();
            match (op, parts.len()) {
                (_, 0) => RowFilter::Empty,
                (_, 1) => parts.remove(0),
                (LogicOp::And, _) => RowFilter::And(parts),
                (LogicOp::Or, _) => RowFilter::Or(parts),
            }
        }
        // Permission gates and constant booleans are access-time checks; they
        // constrain no rows.
        Expression::Permission { .. }
        | Expression::Literal {
            value: Value::Bool(_),
        } => RowFilter::Empty,
        Expression::Literal { .. } | Expression::Field { .. } => {
            warn!(
                expression = ?expression,
                "expression has no row-filter translation; yielding an unconstrained filter"
            );
            RowFilter::Empty
        }
    }
}

fn extract_condition(left: &Expression, right: &Expression, principal: &Principal) -> RowFilter {
    match (left, right) {
        (Expression::Field { path }, Expression::Field { path: user_path })
            if user_path.as_str() == USER_ID_PATH =>
        {
            RowFilter::eq(path.clone(), principal.id())
        }
        (Expression::Field { path }, Expression::Literal { value }) => {
            RowFilter::eq(path.clone(), value.clone())
        }
        _ => {
            warn!("equality condition has no row-filter translation; yielding an unconstrained filter");
            RowFilter::Empty
        }
    }
}

/// Checks that an allow expression is fully translatable into a row filter.
///
/// Rule validation rejects anything that is not, so an engine can never grant
/// access on an expression whose query constraint would silently widen to all
/// rows.
pub(crate) fn check_extractable(expression: &Expression) -> Result<(), &'static str> {
    match expression {
        Expression::Condition {
            op: CompareOp::Eq,
            left,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (Expression::Field { .. }, Expression::Field { path })
                if path.as_str() == USER_ID_PATH =>
            {
                Ok(())
            }
            (Expression::Field { .. }, Expression::Literal { .. }) => Ok(()),
            _ => Err("equality must compare a field against a literal or the requesting user id"),
        },
        Expression::Operation { args, .. } => {
            args.iter().try_for_each(check_extractable)
        }
        Expression::Permission { .. } => Ok(()),
        Expression::Literal { value } => match value {
            Value::Bool(_) => Ok(()),
            _ => Err("only boolean literals can act as unconditional gates"),
        },
        Expression::Field { .. } => Err("a bare field reference has no row-filter meaning"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn principal() -> Principal {
        Principal::new("u1")
    }

    #[test]
    fn user_id_comparison_substitutes_the_live_id() {
        let expr = Expression::eq(Expression::field("uploadedBy"), Expression::user_id());
        let filter = extract_row_filter(&expr, &principal());
        assert_eq!(filter.to_value(), json!({"uploadedBy": "u1"}));
    }

    #[test]
    fn literal_comparison_carries_the_value() {
        let expr = Expression::eq(Expression::field("isPublic"), Expression::literal(true));
        let filter = extract_row_filter(&expr, &principal());
        assert_eq!(filter.to_value(), json!({"isPublic": true}));
    }

    #[test]
    fn disjunction_collects_non_empty_arms() {
        let expr = Expression::or([
            Expression::eq(Expression::field("isPublic"), Expression::literal(true)),
            Expression::eq(Expression::field("uploadedBy"), Expression::user_id()),
        ]);

        let filter = extract_row_filter(&expr, &principal());
        assert_eq!(
            filter.to_value(),
            json!({"OR": [{"isPublic": true}, {"uploadedBy": "u1"}]})
        );
    }

    #[test]
    fn singleton_connectives_unwrap() {
        let expr = Expression::or([
            Expression::permission("tracks:purge"),
            Expression::eq(Expression::field("uploadedBy"), Expression::user_id()),
        ]);

        let filter = extract_row_filter(&expr, &principal());
        assert_eq!(filter.to_value(), json!({"uploadedBy": "u1"}));
    }

    #[test]
    fn all_empty_arms_collapse_to_empty() {
        let expr = Expression::and([
            Expression::permission("a"),
            Expression::literal(true),
        ]);

        let filter = extract_row_filter(&expr, &principal());
        assert!(filter.is_empty());
        assert_eq!(filter.to_value(), json!({}));
    }

    #[test]
    fn nested_connectives_recurse() {
        let expr = Expression::and([
            Expression::eq(Expression::field("status"), Expression::literal("live")),
            Expression::or([
                Expression::eq(Expression::field("isPublic"), Expression::literal(true)),
                Expression::eq(Expression::field("uploadedBy"), Expression::user_id()),
            ]),
        ]);

        let filter = extract_row_filter(&expr, &principal());
        assert_eq!(
            filter.to_value(),
            json!({"AND": [
                {"status": "live"},
                {"OR": [{"isPublic": true}, {"uploadedBy": "u1"}]},
            ]})
        );
    }

    #[test]
    fn never_filter_matches_no_rows() {
        assert_eq!(RowFilter::never().to_value(), json!({"id": "__never__"}));
    }

    #[test]
    fn conjoining_elides_empty_sides() {
        let caller = RowFilter::Raw(json!({"genre": "jazz"}));
        let combined = caller.clone().and(RowFilter::Empty);
        assert_eq!(combined.to_value(), json!({"genre": "jazz"}));

        let combined = caller.and(RowFilter::eq("uploadedBy", "u1"));
        assert_eq!(
            combined.to_value(),
            json!({"AND": [{"genre": "jazz"}, {"uploadedBy": "u1"}]})
        );
    }

    #[test]
    fn extractability_mirrors_the_recognized_shapes() {
        let ok = Expression::or([
            Expression::eq(Expression::field("isPublic"), Expression::literal(true)),
            Expression::permission("tracks:purge"),
            Expression::literal(false),
        ]);
        assert!(check_extractable(&ok).is_ok());

        assert!(check_extractable(&Expression::field("isPublic")).is_err());
        assert!(check_extractable(&Expression::literal("yes")).is_err());

        let reversed = Expression::eq(Expression::literal(true), Expression::field("isPublic"));
        assert!(check_extractable(&reversed).is_err());

        let buried = Expression::and([
            Expression::eq(Expression::field("a"), Expression::literal(1)),
            Expression::or([Expression::field("b")]),
        ]);
        assert!(check_extractable(&buried).is_err());
    }
}
