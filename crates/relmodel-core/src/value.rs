//! The dynamic value type carried in records, filters, and plans.
//!
//! `Value` is the single runtime representation for column data. Drivers
//! produce and consume it, the predicate engine compares it, and the
//! projection layer serializes it. Comparison is deliberately *loose* across
//! representations (numeric cross-type, ISO-8601 text against temporal
//! values, scalar JSON against plain scalars) because record payloads arrive
//! as untyped JSON while schema metadata decides how they are interpreted.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A dynamically-typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL / JSON null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer (covers all integral column widths).
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Text, including enum labels and UUIDs.
    Text(String),
    /// Calendar date without time-of-day.
    Date(NaiveDate),
    /// Time-of-day without date.
    Time(NaiveTime),
    /// Date and time-of-day, timezone-naive.
    DateTime(NaiveDateTime),
    /// Arbitrary JSON document (json/jsonb columns).
    Json(serde_json::Value),
    /// Homogeneous list, used for membership and range filter values.
    Array(Vec<Value>),
}

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";
const DATETIME_FMTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

impl Value {
    /// True for the `Null` variant.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view of the value, if it is integral.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Json(j) => j.as_i64(),
            _ => None,
        }
    }

    /// Floating-point view, widening integers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Json(j) => j.as_f64(),
            _ => None,
        }
    }

    /// Borrowed string view for textual values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Json(j) => j.as_str(),
            _ => None,
        }
    }

    /// Boolean view.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Json(j) => j.as_bool(),
            _ => None,
        }
    }

    /// Borrowed slice view for list values.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The date portion of the value.
    ///
    /// `Date` yields itself, `DateTime` drops the time-of-day, and text is
    /// parsed as ISO-8601 (date-only or datetime). Everything else is `None`.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            Value::Text(s) => NaiveDate::parse_from_str(s, DATE_FMT)
                .ok()
                .or_else(|| parse_datetime_text(s).map(|dt| dt.date())),
            _ => None,
        }
    }

    /// Datetime view, promoting bare dates to midnight and parsing text.
    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            Value::Text(s) => parse_datetime_text(s).or_else(|| {
                NaiveDate::parse_from_str(s, DATE_FMT)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            }),
            _ => None,
        }
    }

    /// Time-of-day view, parsing `HH:MM:SS` text.
    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            Value::DateTime(dt) => Some(dt.time()),
            Value::Text(s) => NaiveTime::parse_from_str(s, TIME_FMT).ok(),
            _ => None,
        }
    }

    /// Lossy text rendering, used by substring and set-membership filters.
    #[must_use]
    pub fn to_text_lossy(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format(DATE_FMT).to_string(),
            Value::Time(t) => t.format(TIME_FMT).to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Value::Json(j) => match j.as_str() {
                Some(s) => s.to_string(),
                None => j.to_string(),
            },
            Value::Array(items) => items
                .iter()
                .map(Value::to_text_lossy)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Partial ordering across representations.
    ///
    /// Numeric values compare across `Int`/`Float`, temporal values compare
    /// against parsable text, and scalar JSON values compare as their plain
    /// counterpart. Incomparable pairs yield `None` and any filter built on
    /// them evaluates to false.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Json(a), _) if is_scalar_json(a) => {
                Value::from(a.clone()).compare(other)
            }
            (_, Value::Json(b)) if is_scalar_json(b) => {
                self.compare(&Value::from(b.clone()))
            }
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Date(_) | Value::DateTime(_), _)
            | (_, Value::Date(_) | Value::DateTime(_)) => {
                match (self.as_datetime(), other.as_datetime()) {
                    (Some(a), Some(b)) => Some(a.cmp(&b)),
                    _ => None,
                }
            }
            (Value::Time(_), _) | (_, Value::Time(_)) => {
                match (self.as_time(), other.as_time()) {
                    (Some(a), Some(b)) => Some(a.cmp(&b)),
                    _ => None,
                }
            }
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality as filters see it.
    ///
    /// Besides [`Value::compare`] equality this accepts a JSON document
    /// against its serialized text form, which is how equality on json/jsonb
    /// columns reaches the store.
    #[must_use]
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Json(a), Value::Text(s)) | (Value::Text(s), Value::Json(a)) => {
                a.to_string() == *s || self.compare(other) == Some(Ordering::Equal)
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    /// Total ordering for sort keys: NULL sorts first, incomparable pairs
    /// keep their relative order.
    #[must_use]
    pub fn order_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FMTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn is_scalar_json(j: &serde_json::Value) -> bool {
    !(j.is_object() || j.is_array())
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Json(obj),
        }
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format(DATE_FMT)),
            Value::Time(t) => serializer.collect_str(&t.format(TIME_FMT)),
            Value::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::Json(j) => j.serialize(serializer),
            Value::Array(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cross_type_compare() {
        assert_eq!(
            Value::Int(3).compare(&Value::Float(3.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Float(2.5).compare(&Value::Int(3)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn temporal_text_coercion() {
        let date = Value::Date(NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date"));
        assert_eq!(
            date.compare(&Value::Text("2024-05-01".to_string())),
            Some(Ordering::Equal)
        );
        assert_eq!(
            date.compare(&Value::Text("2024-05-02T08:30:00".to_string())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn datetime_date_portion() {
        let dt = Value::Text("2024-05-01T17:45:00".to_string());
        assert_eq!(dt.as_date(), NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn json_serialized_equality() {
        let doc = Value::Json(serde_json::json!({"a": 1}));
        assert!(doc.loose_eq(&Value::Text("{\"a\":1}".to_string())));
        assert!(!doc.loose_eq(&Value::Text("{\"a\":2}".to_string())));
    }

    #[test]
    fn json_scalar_compare() {
        let n = Value::Json(serde_json::json!(7));
        assert_eq!(n.compare(&Value::Int(7)), Some(Ordering::Equal));
    }

    #[test]
    fn null_sorts_first() {
        assert_eq!(Value::Null.order_cmp(&Value::Int(1)), Ordering::Less);
        assert_eq!(Value::Int(1).order_cmp(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn deserializes_from_json_shapes() {
        let v: Value = serde_json::from_str("[1, \"x\"]").expect("array");
        assert_eq!(
            v,
            Value::Array(vec![Value::Int(1), Value::Text("x".to_string())])
        );
        let v: Value = serde_json::from_str("{\"k\": true}").expect("object");
        assert!(matches!(v, Value::Json(_)));
    }
}
