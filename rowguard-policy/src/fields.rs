//! Field-level grant resolution and payload shaping.

use serde_json::{Map, Value};

use crate::decision::{AllowedFields, FIELD_WILDCARD};
use crate::rule::FieldRules;

/// Resolves a rule's field configuration into concrete grant lists.
///
/// Missing or empty `read`/`write` lists widen to the wildcard. A non-empty
/// deny list always wins: denied names are stripped from explicit lists, and
/// a wildcard collapses to nothing, since without schema introspection there
/// is no safe way to compute "all fields minus deny".
#[must_use]
pub fn filter_fields(rules: Option<&FieldRules>) -> AllowedFields {
    let Some(rules) = rules else {
        return AllowedFields::all();
    };

    let read = grant_list(rules.read());
    let write = grant_list(rules.write());

    if rules.deny().is_empty() {
        return AllowedFields::new(read, write);
    }

    AllowedFields::new(
        apply_deny(read, rules.deny()),
        apply_deny(write, rules.deny()),
    )
}

fn grant_list(granted: &[String]) -> Vec<String> {
    if granted.is_empty() {
        vec![FIELD_WILDCARD.into()]
    } else {
        granted.to_vec()
    }
}

fn apply_deny(fields: Vec<String>, deny: &[String]) -> Vec<String> {
    if fields.iter().any(|field| field == FIELD_WILDCARD) {
        return Vec::new();
    }
    fields
        .into_iter()
        .filter(|field| !deny.contains(field))
        .collect()
}

/// Strips a payload down to the keys the supplied grant list allows.
///
/// Data shaping only, not an authorization decision: callers run this over a
/// create/update payload after the access check has already passed.
#[must_use]
pub fn filter_data_fields(data: &Map<String, Value>, allowed: &[String]) -> Map<String, Value> {
    if allowed.iter().any(|field| field == FIELD_WILDCARD) {
        return data.clone();
    }
    if allowed.is_empty() {
        return Map::new();
    }
    data.iter()
        .filter(|(key, _)| allowed.iter().any(|field| field == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_config_grants_everything() {
        let fields = filter_fields(None);
        assert_eq!(fields.read(), [FIELD_WILDCARD]);
        assert_eq!(fields.write(), [FIELD_WILDCARD]);
    }

    #[test]
    fn empty_lists_widen_to_wildcard() {
        let fields = filter_fields(Some(&FieldRules::new()));
        assert_eq!(fields.read(), [FIELD_WILDCARD]);
        assert_eq!(fields.write(), [FIELD_WILDCARD]);
    }

    #[test]
    fn deny_collapses_wildcards_to_nothing() {
        let rules = FieldRules::new().with_deny(["secret"]);
        let fields = filter_fields(Some(&rules));
        assert!(fields.read().is_empty());
        assert!(fields.write().is_empty());
    }

    #[test]
    fn deny_strips_explicit_lists() {
        let rules = FieldRules::new()
            .with_read(["title", "plays", "uploadedBy"])
            .with_write(["title", "uploadedBy"])
            .with_deny(["uploadedBy", "plays"]);

        let fields = filter_fields(Some(&rules));
        assert_eq!(fields.read(), ["title"]);
        assert_eq!(fields.write(), ["title"]);
    }

    #[test]
    fn deny_never_leaks_into_grants() {
        let rules = FieldRules::new()
            .with_write(["name", "email"])
            .with_deny(["role", "permissions"]);

        let fields = filter_fields(Some(&rules));
        assert!(!fields.can_write("role"));
        assert!(!fields.can_write("permissions"));
        assert!(fields.can_write("name"));
    }

    #[test]
    fn payload_shaping_respects_the_grant_list() {
        let data = json!({"role": "admin", "name": "x"})
            .as_object()
            .cloned()
            .expect("object");

        let shaped = filter_data_fields(&data, &["name".into(), "email".into()]);
        assert_eq!(Value::Object(shaped), json!({"name": "x"}));
    }

    #[test]
    fn wildcard_passes_payloads_through() {
        let data = json!({"a": 1, "b": 2}).as_object().cloned().expect("object");

        let shaped = filter_data_fields(&data, &[FIELD_WILDCARD.into()]);
        assert_eq!(shaped, data);

        let stripped = filter_data_fields(&data, &[]);
        assert!(stripped.is_empty());
    }
}
