//! Request contracts supplied to the policy engine per authorization check.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rule::CrudAction;

/// The resolved user an authorization check runs on behalf of.
///
/// Session and token handling happen upstream; by the time a principal reaches
/// the engine it is plain data and is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    permissions: Vec<String>,
}

impl Principal {
    /// Creates a principal with the supplied identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Sets the principal's roles.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the principal's granted permissions.
    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the principal's identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the principal's roles.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns the principal's granted permissions.
    #[must_use]
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// Returns `true` when the principal holds the named permission.
    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|granted| granted == name)
    }

    /// Serializes the principal into the object shape expressions see under
    /// the `user` root.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(self.id.clone()));
        map.insert(
            "roles".into(),
            Value::Array(self.roles.iter().cloned().map(Value::String).collect()),
        );
        map.insert(
            "permissions".into(),
            Value::Array(
                self.permissions
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        map
    }
}

/// Full request evaluated by the policy engine.
///
/// Built fresh per authorization check and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyContext {
    principal: Principal,
    model: String,
    action: CrudAction,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    where_filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
}

impl PolicyContext {
    /// Creates a context for the supplied principal, model, and action.
    #[must_use]
    pub fn new(principal: Principal, model: impl Into<String>, action: CrudAction) -> Self {
        Self {
            principal,
            model: model.into(),
            action,
            where_filter: None,
            data: None,
        }
    }

    /// Attaches the caller's existing query filter, preserved verbatim when
    /// the engine composes row filters.
    #[must_use]
    pub fn with_where(mut self, where_filter: Value) -> Self {
        self.where_filter = Some(where_filter);
        self
    }

    /// Attaches the record data the check runs against (the candidate row for
    /// reads, the incoming payload for writes).
    #[must_use]
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns the requesting principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the model under check.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the action under check.
    #[must_use]
    pub fn action(&self) -> CrudAction {
        self.action
    }

    /// Returns the caller-supplied query filter, if any.
    #[must_use]
    pub fn where_filter(&self) -> Option<&Value> {
        self.where_filter.as_ref()
    }

    /// Returns the record data, if any.
    #[must_use]
    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }
}
