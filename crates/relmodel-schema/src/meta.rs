//! The cached per-entity metadata bundle.
//!
//! `ModelConfig` is what the query builder, CRUD engine, and projection layer
//! consume at request time. It is a read-only derived projection of the
//! declared schema: built once per entity type, identical on every rebuild,
//! and shared behind an `Arc` for the process lifetime.

use std::collections::BTreeMap;

use relmodel_core::BaseType;
use serde::{Deserialize, Serialize};

/// The classified cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// Many source rows reference one target (`hero.team`).
    ManyToOne,
    /// One source row owns many targets (`team.heroes`).
    OneToMany,
    /// Exactly one target per source (`user.profile`).
    OneToOne,
    /// Many-to-many through a junction table (`hero.powers`).
    ManyToMany,
}

impl RelationKind {
    /// Short code used in diagnostics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RelationKind::ManyToOne => "m2o",
            RelationKind::OneToMany => "o2m",
            RelationKind::OneToOne => "o2o",
            RelationKind::ManyToMany => "m2m",
        }
    }

    /// True for kinds whose value is a sequence of targets.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, RelationKind::OneToMany | RelationKind::ManyToMany)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved junction-table metadata for a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMeta {
    /// Junction table name.
    pub table: String,
    /// Junction column referencing the source side.
    pub source_secondary_key: String,
    /// Junction column referencing the target side.
    pub target_secondary_key: String,
    /// Source column the junction references (usually the identifier).
    pub source_key: String,
    /// Target column the junction references (usually the identifier).
    pub target_key: String,
}

/// Resolved metadata for one relationship field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMeta {
    /// Classified cardinality.
    pub kind: RelationKind,
    /// Declaring entity name.
    pub source: String,
    /// Target entity name.
    pub target: String,
    /// Declaring entity's table.
    pub source_table: String,
    /// Target entity's table.
    pub target_table: String,
    /// Identifier field of the declaring entity.
    pub source_id_key: String,
    /// Identifier field of the target entity.
    pub target_id_key: String,
    /// Source column referenced by the target-side foreign key.
    pub source_key: Option<String>,
    /// Foreign-key column on the source referencing the target
    /// (many-to-one, or a one-to-one joined on a non-identifier column).
    pub source_fk: Option<String>,
    /// Foreign-key column on the target referencing the source
    /// (one-to-many, one-to-one).
    pub target_fk: Option<String>,
    /// Junction metadata, present exactly for many-to-many.
    pub link: Option<LinkMeta>,
}

/// Metadata for one declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Field name.
    pub name: String,
    /// Canonical base type; `Relation` when `relation` is present.
    pub base_type: BaseType,
    /// The store's native type tag as declared.
    pub native_type: String,
    /// Relation metadata for relationship fields.
    pub relation: Option<RelationMeta>,
}

impl ColumnMeta {
    /// True for physical scalar columns (everything that lives in the row).
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.relation.is_none()
    }
}

/// The immutable per-entity metadata bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Entity name.
    pub entity: String,
    /// Backing table name.
    pub table: String,
    /// Identifier field name.
    pub id_key: String,
    /// Field name to metadata.
    pub columns: BTreeMap<String, ColumnMeta>,
    /// Physical scalar columns in declaration order.
    pub scalar_order: Vec<String>,
    /// Every declared field (scalar and relation) in declaration order.
    pub field_order: Vec<String>,
}

impl ModelConfig {
    /// Metadata for a field, if declared.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.get(name)
    }

    /// Relation metadata for a field, if it is a relationship.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationMeta> {
        self.columns.get(name).and_then(|c| c.relation.as_ref())
    }

    /// True if `name` is a declared physical scalar column.
    #[must_use]
    pub fn is_scalar_column(&self, name: &str) -> bool {
        self.columns.get(name).is_some_and(ColumnMeta::is_scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_kind_codes() {
        assert_eq!(RelationKind::ManyToOne.as_str(), "m2o");
        assert_eq!(RelationKind::ManyToMany.as_str(), "m2m");
        assert!(RelationKind::OneToMany.is_collection());
        assert!(!RelationKind::OneToOne.is_collection());
    }
}
