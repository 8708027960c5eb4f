//! # Field Normalizer: Canonical Forms for Equality Comparison
//!
//! Raw field values arrive as whatever the UI or the database produced: a
//! date may be `"2024-01-05"`, `"2024-01-05T14:00:00Z"`, `"1/5/2024"` or
//! `"January 5th, 2024"`; a rating may be `3` or `"3"`; an unassigned operator
//! may be `null`, `""` or `"0"`. [`normalize`] folds each of these into a
//! [`Normalized`] value so that the diff builder compares meaning, not
//! formatting.
//!
//! ## Guarantees
//!
//! - **Total**: every input yields a value; malformed input degrades to
//!   [`Normalized::Null`] or to its trimmed text, never a panic.
//! - **Deterministic**: no clock, locale or global state is consulted.
//! - **Idempotent**: `normalize(t, &normalize(t, x).to_value()) == normalize(t, x)`.

use crate::field::FieldType;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::Value;
use std::fmt;

/// Canonical, comparable form of a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Null,
    Date(NaiveDate),
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Normalized {
    pub fn is_null(&self) -> bool {
        matches!(self, Normalized::Null)
    }

    /// String form stored in history rows. `Null` stores as SQL `NULL`.
    pub fn stringify(&self) -> Option<String> {
        match self {
            Normalized::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// JSON form, used when a normalized value is fed back through the
    /// normalizer or written out.
    pub fn to_value(&self) -> Value {
        match self {
            Normalized::Null => Value::Null,
            Normalized::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Normalized::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Normalized::Bool(b) => Value::Bool(*b),
            Normalized::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Normalized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalized::Null => write!(f, "null"),
            Normalized::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Normalized::Number(n) => write!(f, "{}", format_number(*n)),
            Normalized::Bool(b) => write!(f, "{}", b),
            Normalized::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Render integral values without a fractional part (`3`, not `3.0`).
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Normalize a raw value according to the field's declared type.
pub fn normalize(field_type: FieldType, raw: &Value) -> Normalized {
    match field_type {
        FieldType::Date => normalize_date(raw),
        FieldType::Number => normalize_number(raw),
        FieldType::Boolean => normalize_bool(raw),
        FieldType::Text => normalize_text(raw),
        FieldType::Reference => match normalize_text(raw) {
            Normalized::Text(s) if s == "0" => Normalized::Null,
            other => other,
        },
    }
}

fn normalize_text(raw: &Value) -> Normalized {
    match raw {
        Value::Null => Normalized::Null,
        Value::String(s) => text_or_null(s),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() => Normalized::Text(format_number(f)),
            _ => Normalized::Text(n.to_string()),
        },
        Value::Bool(b) => Normalized::Text(b.to_string()),
        other => Normalized::Text(other.to_string()),
    }
}

fn text_or_null(s: &str) -> Normalized {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Normalized::Null
    } else {
        Normalized::Text(trimmed.to_string())
    }
}

fn normalize_number(raw: &Value) -> Normalized {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Normalized::Number(f),
        _ => Normalized::Null,
    }
}

fn normalize_bool(raw: &Value) -> Normalized {
    match raw {
        Value::Null => Normalized::Null,
        Value::Bool(b) => Normalized::Bool(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Normalized::Bool(true),
            Some(f) if f == 0.0 => Normalized::Bool(false),
            Some(f) if f.is_finite() => Normalized::Number(f),
            _ => Normalized::Null,
        },
        Value::String(s) => match s.trim() {
            "true" | "1" => Normalized::Bool(true),
            "false" | "0" => Normalized::Bool(false),
            other => text_or_null(other),
        },
        other => Normalized::Text(other.to_string()),
    }
}

fn normalize_date(raw: &Value) -> Normalized {
    let parsed = match raw {
        Value::String(s) => parse_date(s),
        // Epoch milliseconds, as a JavaScript Date serializes to a number.
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive())
            .filter(|d| (1..=9999).contains(&d.year())),
        _ => None,
    };
    parsed.map(Normalized::Date).unwrap_or(Normalized::Null)
}

/// Best-effort recognition of the date formats the fleet UI produces.
///
/// Accepted: `YYYY-MM-DD` with any trailing time/offset, `M/D/YYYY`, and
/// `Month D, YYYY` / `Mon D, YYYY` with optional ordinal suffixes.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    parse_iso_prefix(s)
        .or_else(|| parse_slashed(s))
        .or_else(|| parse_month_name(s))
        .filter(|d| (1..=9999).contains(&d.year()))
}

fn parse_iso_prefix(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10)?;
    let bytes = head.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_slashed(s: &str) -> Option<NaiveDate> {
    let date_part = s.split_whitespace().next()?;
    let mut parts = date_part.split('/');
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year_str = parts.next()?;
    if parts.next().is_some() || year_str.len() != 4 {
        return None;
    }
    let year: i32 = year_str.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_month_name(s: &str) -> Option<NaiveDate> {
    let mut tokens = s
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());
    let month = month_from_name(tokens.next()?)?;
    let day: u32 = strip_ordinal(tokens.next()?).parse().ok()?;
    let year: i32 = tokens.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn strip_ordinal(token: &str) -> &str {
    let lower = token.to_ascii_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if lower.ends_with(suffix) && token.len() > suffix.len() {
            return &token[..token.len() - suffix.len()];
        }
    }
    token
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    let lower = name.trim_end_matches('.').to_ascii_lowercase();
    if lower == "sept" {
        return Some(9);
    }
    MONTHS
        .iter()
        .position(|m| *m == lower || (lower.len() == 3 && m.starts_with(lower.as_str())))
        .map(|i| i as u32 + 1)
}

/// Canonical value to persist for a typed column.
///
/// Blank input clears the column. Dates are written as `YYYY-MM-DD`, numbers
/// as JSON numbers (integral values without a fraction, so integer columns
/// accept them) and booleans as JSON booleans. Text and reference values are
/// written as given. Returns `None` when a non-blank value cannot be read as
/// its declared type.
pub fn storage_value(field_type: FieldType, raw: &Value) -> Option<Value> {
    let blank = match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if blank {
        return Some(Value::Null);
    }
    match (field_type, normalize(field_type, raw)) {
        (FieldType::Date, Normalized::Date(d)) => Some(Normalized::Date(d).to_value()),
        (FieldType::Number, Normalized::Number(n)) => Some(number_value(n)),
        (FieldType::Boolean, Normalized::Bool(b)) => Some(Value::Bool(b)),
        (FieldType::Text | FieldType::Reference, _) => match raw {
            Value::Array(_) | Value::Object(_) => None,
            other => Some(other.clone()),
        },
        _ => None,
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
