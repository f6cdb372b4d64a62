//! Closed expression grammar consumed by policy rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dotted path that resolves to the id of the requesting user.
pub const USER_ID_PATH: &str = "user.id";

/// Comparison operators usable inside a [`Expression::Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Structural equality of the two operand values.
    Eq,
}

/// Logical connectives usable inside a [`Expression::Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOp {
    /// Every argument must evaluate truthy.
    And,
    /// At least one argument must evaluate truthy.
    Or,
}

/// A node in a policy allow-expression.
///
/// The grammar is deliberately closed: every consumer (the evaluator, the
/// row-filter extractor) matches exhaustively, so adding a variant is a
/// compile-time obligation in each of them rather than a silently-ignored
/// fallthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    /// A constant JSON value.
    Literal {
        /// The constant value.
        value: Value,
    },
    /// A reference into the evaluation context, e.g. `uploadedBy` or `user.id`.
    Field {
        /// Dotted lookup path.
        path: String,
    },
    /// A binary comparison between two sub-expressions.
    Condition {
        /// Comparison operator.
        op: CompareOp,
        /// Left operand.
        left: Box<Expression>,
        /// Right operand.
        right: Box<Expression>,
    },
    /// A logical connective over any number of sub-expressions.
    Operation {
        /// Logical operator.
        op: LogicOp,
        /// Operand expressions, evaluated left to right.
        args: Vec<Expression>,
    },
    /// An access-time permission gate with no row-filter meaning.
    Permission {
        /// Permission name looked up in the requesting user's grants.
        name: String,
    },
}

impl Expression {
    /// Builds a literal node from any JSON-convertible value.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// Builds a field reference node.
    #[must_use]
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field { path: path.into() }
    }

    /// Builds a reference to the requesting user's id.
    #[must_use]
    pub fn user_id() -> Self {
        Self::field(USER_ID_PATH)
    }

    /// Builds an equality condition between two sub-expressions.
    #[must_use]
    pub fn eq(left: Self, right: Self) -> Self {
        Self::Condition {
            op: CompareOp::Eq,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Builds a conjunction over the supplied arguments.
    #[must_use]
    pub fn and(args: impl IntoIterator<Item = Self>) -> Self {
        Self::Operation {
            op: LogicOp::And,
            args: args.into_iter().collect(),
        }
    }

    /// Builds a disjunction over the supplied arguments.
    #[must_use]
    pub fn or(args: impl IntoIterator<Item = Self>) -> Self {
        Self::Operation {
            op: LogicOp::Or,
            args: args.into_iter().collect(),
        }
    }

    /// Builds a permission gate node.
    #[must_use]
    pub fn permission(name: impl Into<String>) -> Self {
        Self::Permission { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expressions_round_trip_through_json() {
        let expr = Expression::or([
            Expression::eq(Expression::field("isPublic"), Expression::literal(true)),
            Expression::eq(Expression::field("uploadedBy"), Expression::user_id()),
        ]);

        let encoded = serde_json::to_value(&expr).expect("serialize");
        let decoded: Expression = serde_json::from_value(encoded.clone()).expect("deserialize");
        assert_eq!(decoded, expr);
        assert_eq!(encoded["kind"], json!("operation"));
        assert_eq!(encoded["op"], json!("or"));
    }

    #[test]
    fn tagged_encoding_matches_wire_shape() {
        let expr = Expression::eq(Expression::field("status"), Expression::literal("active"));
        let encoded = serde_json::to_value(&expr).expect("serialize");

        assert_eq!(
            encoded,
            json!({
                "kind": "condition",
                "op": "eq",
                "left": {"kind": "field", "path": "status"},
                "right": {"kind": "literal", "value": "active"},
            })
        );
    }
}
