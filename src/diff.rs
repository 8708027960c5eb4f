//! # Diff Builder: Field-Level Change Records
//!
//! Compares two snapshots of an entity over a FieldSpec list and emits one
//! [`HistoryRecord`] per field whose normalized values differ. Output order
//! follows the FieldSpec list, so the same inputs always produce the same rows.
//!
//! The builder is a pure transform: it touches no storage and never invents
//! an actor. Callers resolve the actor (and substitute the sentinel for a
//! blank one) before calling.

use crate::entity::HistoryRecord;
use crate::field::FieldSpec;
use crate::normalize::normalize;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

static NULL: Value = Value::Null;

/// Build history records for every tracked field that changed.
///
/// `old` and `new` are keyed by storage column; a missing column reads as
/// `null`. Two nulls are equal and produce no record.
pub fn build_diffs(
    entity_id: Uuid,
    specs: &[FieldSpec],
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    actor: &str,
    now: DateTime<Utc>,
) -> Vec<HistoryRecord> {
    specs
        .iter()
        .filter_map(|spec| {
            let before = normalize(spec.field_type, old.get(spec.storage_column).unwrap_or(&NULL));
            let after = normalize(spec.field_type, new.get(spec.storage_column).unwrap_or(&NULL));
            if before == after {
                return None;
            }
            Some(HistoryRecord {
                entity_id,
                field_name: spec.storage_column.to_string(),
                old_value: before.stringify(),
                new_value: after.stringify(),
                changed_at: now,
                changed_by: actor.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use chrono::TimeZone;
    use serde_json::json;

    const SPECS: &[FieldSpec] = &[
        FieldSpec::new("lastServiceDate", "last_service_date", FieldType::Date),
        FieldSpec::new("cleanlinessRating", "cleanliness_rating", FieldType::Number),
        FieldSpec::new("assignedOperator", "assigned_operator", FieldType::Reference),
        FieldSpec::new("status", "status", FieldType::Text),
    ];

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 10, 30, 0).unwrap()
    }

    fn diff(old: Value, new: Value) -> Vec<HistoryRecord> {
        build_diffs(Uuid::nil(), SPECS, &map(old), &map(new), "op-1", now())
    }

    #[test]
    fn same_day_in_different_formats_is_unchanged() {
        let out = diff(
            json!({"last_service_date": "2024-01-05"}),
            json!({"last_service_date": "01/05/2024"}),
        );
        assert!(out.is_empty(), "{out:?}");
    }

    #[test]
    fn numeric_string_equals_number() {
        let out = diff(
            json!({"cleanliness_rating": 3}),
            json!({"cleanliness_rating": "3"}),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn zero_operator_equals_null_operator() {
        let out = diff(
            json!({"assigned_operator": "0"}),
            json!({"assigned_operator": null}),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn changes_are_emitted_in_field_order() {
        let out = diff(
            json!({"status": "Active", "cleanliness_rating": 2, "last_service_date": "2024-01-05"}),
            json!({"status": "Shop", "cleanliness_rating": "4", "last_service_date": "January 9th, 2024"}),
        );
        let fields: Vec<_> = out.iter().map(|r| r.field_name.as_str()).collect();
        assert_eq!(fields, ["last_service_date", "cleanliness_rating", "status"]);

        assert_eq!(out[0].old_value.as_deref(), Some("2024-01-05"));
        assert_eq!(out[0].new_value.as_deref(), Some("2024-01-09"));
        assert_eq!(out[1].old_value.as_deref(), Some("2"));
        assert_eq!(out[1].new_value.as_deref(), Some("4"));
        assert!(out.iter().all(|r| r.changed_by == "op-1" && r.changed_at == now()));
    }

    #[test]
    fn clearing_a_field_records_null_new_value() {
        let out = diff(json!({"assigned_operator": "op-7"}), json!({"assigned_operator": ""}));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].old_value.as_deref(), Some("op-7"));
        assert_eq!(out[0].new_value, None);
    }

    #[test]
    fn untracked_columns_are_ignored() {
        let out = diff(json!({"notes": "a"}), json!({"notes": "b"}));
        assert!(out.is_empty());
    }

    #[test]
    fn missing_and_null_columns_are_equal() {
        let out = diff(json!({}), json!({"status": null, "last_service_date": "garbage"}));
        assert!(out.is_empty());
    }
}
