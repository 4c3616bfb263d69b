//! Entity schema descriptions consumed from the environment.
//!
//! A descriptor is the engine's only view of an entity: an ordered field
//! list where each field is either a scalar column with a native type tag or
//! a relationship hint. Descriptors are declared by hand or emitted by a
//! build-time generator; the engine never walks a live object graph.

use serde::{Deserialize, Serialize};

/// A `referenced_table.referenced_column` foreign-key target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Table the foreign key points at.
    pub table: String,
    /// Column the foreign key points at.
    pub column: String,
}

impl ForeignKeyRef {
    /// Reference `table.column`.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// A scalar column declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Field name.
    pub name: String,
    /// The store's native type tag (e.g. `"BigInteger"`, `"JSONB"`).
    pub native_type: String,
    /// Whether this column is (part of) the primary key.
    pub primary_key: bool,
    /// Whether this column carries a uniqueness constraint.
    pub unique: bool,
    /// Foreign-key target, when this column references another table.
    pub foreign_key: Option<ForeignKeyRef>,
}

impl ColumnDescriptor {
    /// Declare a column with the given native type tag.
    #[must_use]
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            primary_key: false,
            unique: false,
            foreign_key: None,
        }
    }

    /// Mark as primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declare a foreign key to `table.column`.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef::new(table, column));
        self
    }
}

/// One side of a junction table: a column plus the table identity it
/// forward-references. Side assignment during resolution matches on the
/// referenced table, never on column position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkColumn {
    /// Column name inside the junction table.
    pub column: String,
    /// Table this junction column references.
    pub references_table: String,
    /// Column this junction column references.
    pub references_column: String,
}

impl LinkColumn {
    /// Declare a junction column referencing `table.column`.
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            references_table: table.into(),
            references_column: references_column.into(),
        }
    }
}

/// A junction (link) table realizing a many-to-many relation: the table
/// identifier plus its two foreign-key columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    /// Junction table name.
    pub table: String,
    /// The two foreign-key columns.
    pub columns: [LinkColumn; 2],
}

impl LinkDescriptor {
    /// Declare a junction table with its two foreign-key columns.
    #[must_use]
    pub fn new(table: impl Into<String>, first: LinkColumn, second: LinkColumn) -> Self {
        Self {
            table: table.into(),
            columns: [first, second],
        }
    }
}

/// A relationship field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Field name.
    pub name: String,
    /// Target entity name.
    pub target: String,
    /// Whether this side holds a collection of targets.
    pub collection: bool,
    /// Explicit foreign-key column on the declaring entity, for joins that
    /// do not go through the target's identifier.
    pub foreign_key: Option<String>,
    /// Junction table descriptor; presence forces many-to-many.
    pub link: Option<LinkDescriptor>,
}

impl RelationDescriptor {
    /// Declare a singular relation to `target`.
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            collection: false,
            foreign_key: None,
            link: None,
        }
    }

    /// Mark this side as collection-valued.
    #[must_use]
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Declare the explicit foreign-key column on this entity.
    #[must_use]
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = Some(column.into());
        self
    }

    /// Attach a junction table.
    #[must_use]
    pub fn link(mut self, link: LinkDescriptor) -> Self {
        self.link = Some(link);
        self
    }
}

/// A declared field: scalar column or relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldDescriptor {
    /// Scalar column.
    Column(ColumnDescriptor),
    /// Relationship.
    Relation(RelationDescriptor),
}

impl FieldDescriptor {
    /// The declared field name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            FieldDescriptor::Column(c) => &c.name,
            FieldDescriptor::Relation(r) => &r.name,
        }
    }
}

/// One entity type's declared shape: ordered fields over one stored table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity name, the registry key.
    pub entity: String,
    /// Backing table name.
    pub table: String,
    /// Ordered field declarations.
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// Declare an entity stored in `table`.
    #[must_use]
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// Append a scalar column.
    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.fields.push(FieldDescriptor::Column(column));
        self
    }

    /// Append a relationship.
    #[must_use]
    pub fn relation(mut self, relation: RelationDescriptor) -> Self {
        self.fields.push(FieldDescriptor::Relation(relation));
        self
    }

    /// Iterate scalar columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.fields.iter().filter_map(|f| match f {
            FieldDescriptor::Column(c) => Some(c),
            FieldDescriptor::Relation(_) => None,
        })
    }

    /// Iterate relationship fields in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = &RelationDescriptor> {
        self.fields.iter().filter_map(|f| match f {
            FieldDescriptor::Relation(r) => Some(r),
            FieldDescriptor::Column(_) => None,
        })
    }

    /// The first primary-key column, if one was declared.
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.columns()
            .find(|c| c.primary_key)
            .map(|c| c.name.as_str())
    }
}
