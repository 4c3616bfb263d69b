//! Schema introspection for the relmodel engine.
//!
//! Callers describe each entity once (ordered fields, native type tags,
//! relation hints) and this crate turns the description into an immutable
//! [`ModelConfig`] bundle: canonical column types, classified relation
//! cardinalities, and resolved join keys. Bundles are built lazily, memoized
//! per entity type under a single-flight guard, and never mutated afterwards.
//!
//! Classification is purely structural. A junction descriptor forces
//! many-to-many; otherwise the collection flags of the declaring field and
//! its back-relation decide the kind. Anything unresolvable is a
//! [`Error::Schema`](relmodel_core::Error::Schema) raised when the registry
//! is built, never silently downgraded and never deferred to query time.

pub mod descriptor;
pub mod mapper;
pub mod meta;
pub mod registry;
mod resolver;

pub use descriptor::{
    ColumnDescriptor, EntityDescriptor, FieldDescriptor, ForeignKeyRef, LinkColumn,
    LinkDescriptor, RelationDescriptor,
};
pub use mapper::map_native_type;
pub use meta::{ColumnMeta, LinkMeta, ModelConfig, RelationKind, RelationMeta};
pub use registry::SchemaRegistry;
