//! # Field Specifications: Typed Declarations of Audit-Tracked Columns
//!
//! Each entity kind declares the columns whose changes are recorded in its
//! history table. A [`FieldSpec`] pairs the logical (camelCase) name the UI
//! sends with the storage column and a [`FieldType`] that decides how raw
//! values are normalized before comparison.
//!
//! Types are attached once, at configuration time. Nothing in the crate
//! infers a field's type from its name.

use serde::Serialize;
use std::fmt;

/// Comparison type of a tracked field.
///
/// - **Date**: calendar day, time-of-day discarded.
/// - **Number**: finite `f64` after numeric coercion.
/// - **Text**: trimmed string, empty means null.
/// - **Boolean**: `true/"true"/1/"1"` and `false/"false"/0/"0"`.
/// - **Reference**: text where the sentinel `"0"` / `0` means unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Date,
    Number,
    Text,
    Boolean,
    Reference,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Date => write!(f, "date"),
            FieldType::Number => write!(f, "number"),
            FieldType::Text => write!(f, "text"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Reference => write!(f, "reference"),
        }
    }
}

/// Static declaration of one audit-tracked field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub logical_name: &'static str,
    pub storage_column: &'static str,
    pub field_type: FieldType,
}

impl FieldSpec {
    pub const fn new(
        logical_name: &'static str,
        storage_column: &'static str,
        field_type: FieldType,
    ) -> Self {
        FieldSpec {
            logical_name,
            storage_column,
            field_type,
        }
    }

    /// True if `key` names this field by either its logical or storage name.
    pub fn matches(&self, key: &str) -> bool {
        self.logical_name == key || self.storage_column == key
    }
}

/// Find the FieldSpec addressed by `key` (logical or storage name).
pub fn find_spec<'a>(specs: &'a [FieldSpec], key: &str) -> Option<&'a FieldSpec> {
    specs.iter().find(|s| s.matches(key))
}

/// Storage column names are interpolated into SQL, so they are restricted to
/// lowercase ASCII identifiers.
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[FieldSpec] = &[
        FieldSpec::new("lastServiceDate", "last_service_date", FieldType::Date),
        FieldSpec::new("assignedOperator", "assigned_operator", FieldType::Reference),
    ];

    #[test]
    fn find_spec_accepts_logical_and_storage_names() {
        assert_eq!(
            find_spec(SPECS, "lastServiceDate").map(|s| s.storage_column),
            Some("last_service_date")
        );
        assert_eq!(
            find_spec(SPECS, "assigned_operator").map(|s| s.logical_name),
            Some("assignedOperator")
        );
        assert!(find_spec(SPECS, "status").is_none());
    }

    #[test]
    fn safe_identifier_rejects_sql_fragments() {
        assert!(is_safe_identifier("last_service_date"));
        assert!(is_safe_identifier("_hidden2"));
        for bad in ["", "2col", "Name", "a-b", "x; DROP TABLE mixers", "a b"] {
            assert!(!is_safe_identifier(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn field_type_display_matches_serde() {
        for t in [
            FieldType::Date,
            FieldType::Number,
            FieldType::Text,
            FieldType::Boolean,
            FieldType::Reference,
        ] {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.to_string()));
        }
    }
}
