//! Policy rule model and construction-time validation.

use std::fmt::{self, Display, Formatter};

use rowguard_expr::Expression;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};
use crate::row_filter;

/// CRUD action a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudAction {
    /// Creating a new record.
    Create,
    /// Reading existing records.
    Read,
    /// Updating existing records.
    Update,
    /// Deleting existing records.
    Delete,
}

impl CrudAction {
    /// Returns the lowercase wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl Display for CrudAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level grants attached to a rule.
///
/// Empty `read`/`write` lists mean "all fields"; names in `deny` are excluded
/// from both directions regardless of what the grant lists say.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    read: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    write: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deny: Vec<String>,
}

impl FieldRules {
    /// Creates an empty grant set (all fields readable and writable).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the readable field names.
    #[must_use]
    pub fn with_read<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the writable field names.
    #[must_use]
    pub fn with_write<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the denied field names.
    #[must_use]
    pub fn with_deny<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the readable field names.
    #[must_use]
    pub fn read(&self) -> &[String] {
        &self.read
    }

    /// Returns the writable field names.
    #[must_use]
    pub fn write(&self) -> &[String] {
        &self.write
    }

    /// Returns the denied field names.
    #[must_use]
    pub fn deny(&self) -> &[String] {
        &self.deny
    }
}

/// A single declarative authorization rule.
///
/// Rules are immutable once loaded into an engine. A rule without an `allow`
/// expression never grants access on its own; it can only describe field
/// grants for callers that consult them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    model: String,
    action: CrudAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<FieldRules>,
}

impl PolicyRule {
    /// Creates a rule for the supplied model and action.
    #[must_use]
    pub fn new(model: impl Into<String>, action: CrudAction) -> Self {
        Self {
            name: None,
            model: model.into(),
            action,
            allow: None,
            fields: None,
        }
    }

    /// Attaches a diagnostic name used in log lines and error messages.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches the allow expression that must evaluate truthy to grant.
    #[must_use]
    pub fn with_allow(mut self, allow: Expression) -> Self {
        self.allow = Some(allow);
        self
    }

    /// Attaches field-level grants.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldRules) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Returns the diagnostic name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the model this rule applies to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the action this rule applies to.
    #[must_use]
    pub fn action(&self) -> CrudAction {
        self.action
    }

    /// Returns the allow expression, if any.
    #[must_use]
    pub fn allow(&self) -> Option<&Expression> {
        self.allow.as_ref()
    }

    /// Returns the field grants, if any.
    #[must_use]
    pub fn fields(&self) -> Option<&FieldRules> {
        self.fields.as_ref()
    }

    /// Returns the label used for this rule in logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.model, self.action))
    }

    pub(crate) fn matches(&self, model: &str, action: CrudAction) -> bool {
        self.model == model && self.action == action
    }

    /// Validates the rule's structural and semantic shape.
    ///
    /// Allow expressions must be translatable into a row filter so the access
    /// decision and the query constraint can never disagree; see
    /// [`crate::row_filter::extract_row_filter`].
    pub(crate) fn validate(&self) -> PolicyResult<()> {
        if self.model.trim().is_empty() {
            return Err(PolicyError::InvalidRule {
                rule: self.label(),
                reason: "model cannot be empty".into(),
            });
        }

        if let Some(fields) = &self.fields {
            for (list, names) in [
                ("read", fields.read()),
                ("write", fields.write()),
                ("deny", fields.deny()),
            ] {
                if names.iter().any(|name| name.trim().is_empty()) {
                    return Err(PolicyError::InvalidRule {
                        rule: self.label(),
                        reason: format!("fields.{list} contains an empty field name"),
                    });
                }
            }
        }

        if let Some(allow) = &self.allow {
            row_filter::check_extractable(allow).map_err(|reason| {
                PolicyError::UnsupportedAllowShape {
                    rule: self.label(),
                    reason,
                }
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowguard_expr::Expression;
    use serde_json::json;

    #[test]
    fn rules_deserialize_from_wire_shape() {
        let raw = json!({
            "name": "track-read",
            "model": "Track",
            "action": "read",
            "allow": {
                "kind": "condition",
                "op": "eq",
                "left": {"kind": "field", "path": "isPublic"},
                "right": {"kind": "literal", "value": true},
            },
            "fields": {"read": ["title"], "deny": ["plays"]},
        });

        let rule: PolicyRule = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(rule.model(), "Track");
        assert_eq!(rule.action(), CrudAction::Read);
        assert_eq!(rule.fields().unwrap().read(), ["title"]);
        assert!(rule.allow().is_some());
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn empty_model_is_rejected() {
        let rule = PolicyRule::new("  ", CrudAction::Read);
        let err = rule.validate().expect_err("should reject");
        assert!(matches!(err, PolicyError::InvalidRule { .. }));
    }

    #[test]
    fn empty_field_names_are_rejected() {
        let rule = PolicyRule::new("Track", CrudAction::Update)
            .with_fields(FieldRules::new().with_write(["title", " "]));
        let err = rule.validate().expect_err("should reject");
        assert!(matches!(err, PolicyError::InvalidRule { .. }));
    }

    #[test]
    fn untranslatable_allow_is_rejected() {
        let rule = PolicyRule::new("Track", CrudAction::Read)
            .with_allow(Expression::field("isPublic"));
        let err = rule.validate().expect_err("should reject");
        assert!(matches!(err, PolicyError::UnsupportedAllowShape { .. }));
    }

    #[test]
    fn label_prefers_the_diagnostic_name() {
        let named = PolicyRule::new("Track", CrudAction::Read).with_name("public-tracks");
        assert_eq!(named.label(), "public-tracks");

        let unnamed = PolicyRule::new("Track", CrudAction::Delete);
        assert_eq!(unnamed.label(), "Track.delete");
    }
}
