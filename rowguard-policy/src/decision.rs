//! Decision types returned by the policy engine.

use serde::Serialize;

use crate::row_filter::RowFilter;

/// Sentinel field name meaning "all fields, subject to deny".
pub const FIELD_WILDCARD: &str = "*";

/// Field names the current policy grants for reading and writing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllowedFields {
    read: Vec<String>,
    write: Vec<String>,
}

impl AllowedFields {
    /// Creates a grant from explicit read and write lists.
    #[must_use]
    pub fn new(read: Vec<String>, write: Vec<String>) -> Self {
        Self { read, write }
    }

    /// Grants no fields in either direction.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Grants every field in both directions.
    #[must_use]
    pub fn all() -> Self {
        Self {
            read: vec![FIELD_WILDCARD.into()],
            write: vec![FIELD_WILDCARD.into()],
        }
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

    /// Returns `true` when the named field may be read.
    #[must_use]
    pub fn can_read(&self, field: &str) -> bool {
        Self::grants(&self.read, field)
    }

    /// Returns `true` when the named field may be written.
    #[must_use]
    pub fn can_write(&self, field: &str) -> bool {
        Self::grants(&self.write, field)
    }

    fn grants(fields: &[String], candidate: &str) -> bool {
        fields
            .iter()
            .any(|field| field == FIELD_WILDCARD || field == candidate)
    }
}

/// Outcome of a policy evaluation.
///
/// Produced fresh per check; a denial carries a human-readable reason, a grant
/// carries the row filter and field grants derived from the granting rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessDecision {
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(rename = "rowFilters", skip_serializing_if = "Option::is_none")]
    row_filter: Option<RowFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<AllowedFields>,
}

impl AccessDecision {
    /// Creates a granting decision with the supplied constraints.
    #[must_use]
    pub fn granted(row_filter: RowFilter, fields: AllowedFields) -> Self {
        Self {
            allowed: true,
            reason: None,
            row_filter: Some(row_filter),
            fields: Some(fields),
        }
    }

    /// Creates a denial with an explanatory reason.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            row_filter: None,
            fields: None,
        }
    }

    /// Returns `true` when the action is permitted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Returns the denial reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the row filter the caller must apply, if any.
    #[must_use]
    pub fn row_filter(&self) -> Option<&RowFilter> {
        self.row_filter.as_ref()
    }

    /// Returns the granted field lists, if any.
    #[must_use]
    pub fn fields(&self) -> Option<&AllowedFields> {
        self.fields.as_ref()
    }

    /// Returns the readable field names granted by the decision, if any.
    #[must_use]
    pub fn read_fields(&self) -> Option<&[String]> {
        self.fields.as_ref().map(AllowedFields::read)
    }

    /// Returns the writable field names granted by the decision, if any.
    #[must_use]
    pub fn write_fields(&self) -> Option<&[String]> {
        self.fields.as_ref().map(AllowedFields::write)
    }
}
