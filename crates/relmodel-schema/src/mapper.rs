//! Native column type tags to canonical base types.

use relmodel_core::BaseType;

/// Map a store's native type tag onto the canonical base type.
///
/// Unknown tags degrade to [`BaseType::Any`] so a store extension can never
/// break introspection; `Any` columns still filter and project, they just
/// compare verbatim.
#[must_use]
pub fn map_native_type(tag: &str) -> BaseType {
    match tag {
        "BigInteger" | "Integer" | "SmallInteger" => BaseType::Int,
        "Boolean" => BaseType::Bool,
        "Date" => BaseType::Date,
        "DateTime" => BaseType::DateTime,
        "Enum" => BaseType::Enum,
        "Double" | "Float" => BaseType::Float,
        "String" | "Text" | "Unicode" | "UnicodeText" | "Uuid" => BaseType::Str,
        "Time" => BaseType::Time,
        "JSON" => BaseType::Json,
        "JSONB" => BaseType::Jsonb,
        // Interval, LargeBinary, Numeric, PickleType, and anything a store
        // invents later.
        _ => BaseType::Any,
    }
}
