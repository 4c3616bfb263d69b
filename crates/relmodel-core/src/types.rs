//! Canonical base types.
//!
//! Every store exposes its own zoo of native column type tags; the engine
//! reduces them to this fixed value-domain classification and dispatches all
//! filter and write behavior on it.

use serde::{Deserialize, Serialize};

/// The engine's canonical classification for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    /// Integral numbers of any width.
    Int,
    /// Floating-point numbers.
    Float,
    /// Booleans.
    Bool,
    /// Text, including UUIDs rendered as strings.
    Str,
    /// Calendar dates.
    Date,
    /// Timezone-naive timestamps.
    DateTime,
    /// Time-of-day.
    Time,
    /// JSON documents.
    Json,
    /// Binary JSON documents (distinct native representation, same engine
    /// behavior as `Json`).
    Jsonb,
    /// Enumerated labels.
    Enum,
    /// Unclassifiable native types; compared verbatim, never rejected.
    Any,
    /// A relationship field, carrying relation metadata instead of values.
    Relation,
}

impl BaseType {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BaseType::Int => "int",
            BaseType::Float => "float",
            BaseType::Bool => "bool",
            BaseType::Str => "str",
            BaseType::Date => "date",
            BaseType::DateTime => "datetime",
            BaseType::Time => "time",
            BaseType::Json => "json",
            BaseType::Jsonb => "jsonb",
            BaseType::Enum => "enum",
            BaseType::Any => "any",
            BaseType::Relation => "relation",
        }
    }

    /// Date/time/datetime family.
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(self, BaseType::Date | BaseType::DateTime | BaseType::Time)
    }

    /// json/jsonb family.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, BaseType::Json | BaseType::Jsonb)
    }

    /// Types whose typed-filter dispatch is membership/substring/equality.
    #[must_use]
    pub const fn is_scalar_filterable(&self) -> bool {
        matches!(
            self,
            BaseType::Int | BaseType::Float | BaseType::Enum | BaseType::Any | BaseType::Str
        )
    }
}

impl std::fmt::Display for BaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families() {
        assert!(BaseType::DateTime.is_temporal());
        assert!(!BaseType::Json.is_temporal());
        assert!(BaseType::Jsonb.is_json());
        assert!(BaseType::Enum.is_scalar_filterable());
        assert!(!BaseType::Relation.is_scalar_filterable());
    }

    #[test]
    fn serde_names_are_lowercase() {
        let s = serde_json::to_string(&BaseType::DateTime).expect("serialize");
        assert_eq!(s, "\"datetime\"");
    }
}
