//! Representation-neutral field-name-to-value records.
//!
//! A [`Record`] is the shape every engine operation accepts and returns:
//! payloads for writes, rows from the store, and projected representations.
//! Key *presence* carries meaning: a field absent from a payload is "unset"
//! and untouched by partial updates, which is distinct from a field set to
//! [`Value::Null`](crate::Value::Null).

use std::collections::BTreeMap;

use crate::value::Value;

/// An ordered field-name-to-value map.
pub type Record = BTreeMap<String, Value>;

/// Build a [`Record`] from `key => value` pairs.
///
/// Values are converted through [`Value::from`](crate::Value), so plain
/// literals work directly:
///
/// ```
/// use relmodel_core::{record, Value};
///
/// let row = record! { "name" => "alice", "age" => 31 };
/// assert_eq!(row.get("age"), Some(&Value::Int(31)));
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.insert(($key).to_string(), $crate::Value::from($value)); )+
        record
    }};
}

/// Clone a record keeping only the named fields.
#[must_use]
pub fn project_fields(record: &Record, fields: &[String]) -> Record {
    fields
        .iter()
        .filter_map(|name| record.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_macro_converts_literals() {
        let row = record! { "id" => 1, "name" => "a", "missing" => Value::Null };
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("name"), Some(&Value::Text("a".to_string())));
        assert!(row.get("missing").is_some_and(Value::is_null));
    }

    #[test]
    fn project_keeps_named_fields_only() {
        let row = record! { "a" => 1, "b" => 2 };
        let out = project_fields(&row, &["b".to_string(), "c".to_string()]);
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("b"), Some(&Value::Int(2)));
    }
}
