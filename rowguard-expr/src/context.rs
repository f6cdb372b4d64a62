//! Evaluation context assembled per policy check.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named value roots visible to an expression during evaluation.
///
/// Paths resolve against `data` unless their first segment names one of the
/// other roots: `user.id` reads the requesting user, `params.limit` reads the
/// free-form parameter map, `globals.model` reads engine-supplied globals.
/// A bare `uploadedBy` reads the record under evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressionContext {
    #[serde(default)]
    data: Map<String, Value>,
    #[serde(default)]
    user: Map<String, Value>,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default)]
    globals: Map<String, Value>,
}

impl ExpressionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the record data the expression runs against.
    #[must_use]
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Sets the requesting user object.
    #[must_use]
    pub fn with_user(mut self, user: Map<String, Value>) -> Self {
        self.user = user;
        self
    }

    /// Sets the free-form parameter map.
    #[must_use]
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Sets engine-supplied globals such as the model and action under check.
    #[must_use]
    pub fn with_globals(mut self, globals: Map<String, Value>) -> Self {
        self.globals = globals;
        self
    }

    /// Returns the record data root.
    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Returns the user root.
    #[must_use]
    pub fn user(&self) -> &Map<String, Value> {
        &self.user
    }

    /// Returns the parameter root.
    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Returns the globals root.
    #[must_use]
    pub fn globals(&self) -> &Map<String, Value> {
        &self.globals
    }

    /// Resolves a dotted path to a value, yielding JSON null for anything
    /// missing. Resolution never fails: absent fields compare like null.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();

        let (root, start) = match first {
            "user" => (&self.user, segments.next()),
            "params" => (&self.params, segments.next()),
            "globals" => (&self.globals, segments.next()),
            _ => (&self.data, Some(first)),
        };

        // A bare root name (`user`) yields the whole object.
        let Some(key) = start else {
            return Value::Object(root.clone());
        };

        let mut current = root.get(key);
        for segment in segments {
            current = current
                .and_then(Value::as_object)
                .and_then(|object| object.get(segment));
        }

        current.cloned().unwrap_or(Value::Null)
    }
}
