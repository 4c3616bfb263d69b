//! relmodel: a relational-metadata introspection and dynamic query/CRUD
//! engine.
//!
//! Declare each entity's schema once, columns with native type tags and
//! relationships with cardinality hints, and the engine derives everything
//! else: canonical column types, classified relation kinds with resolved
//! join keys, filtered/sorted/paginated queries, and relation-aware
//! create/update/delete, all without per-entity code.
//!
//! # Quick Tour
//!
//! ```
//! use std::sync::Arc;
//! use relmodel::prelude::*;
//! use relmodel_memory::{MemoryStore, TableDef};
//!
//! let registry = Arc::new(SchemaRegistry::new());
//! registry
//!     .register(
//!         EntityDescriptor::new("user", "users")
//!             .column(ColumnDescriptor::new("id", "BigInteger").primary_key())
//!             .column(ColumnDescriptor::new("name", "String").unique()),
//!     )
//!     .expect("register user");
//! registry.build_all().expect("schema is sound");
//!
//! let store = MemoryStore::new();
//! store.define_table(TableDef::new("users").auto_id("id").unique("name"));
//!
//! let users = CrudEngine::for_entity(Arc::clone(&registry), "user").expect("engine");
//! let mut uow = store.uow();
//! let row = users
//!     .add(&mut uow, &record! { "name" => "alice" })
//!     .expect("insert");
//! assert_eq!(row.get("id"), Some(&Value::Int(1)));
//! ```
//!
//! # Crate Map
//!
//! - [`relmodel_core`]: values, records, the select-plan representation,
//!   the [`UnitOfWork`] contract, and the error taxonomy.
//! - [`relmodel_schema`]: entity descriptors, the native type mapper, the
//!   relation resolver, and the memoized [`SchemaRegistry`].
//! - [`relmodel_query`]: declarative [`QueryParams`] and the predicate
//!   engine.
//! - [`relmodel_crud`]: the [`CrudEngine`] and [`Projector`].

pub use relmodel_core::{
    BaseType, ColumnRef, Direction, Error, Filter, Join, Record, Result, SelectPlan, StoreError,
    UnitOfWork, Value, record,
};
pub use relmodel_crud::{CrudEngine, Projector};
pub use relmodel_query::{FilterOp, QueryBuild, QueryEngine, QueryParam, QueryParams, QueryResult};
pub use relmodel_schema::{
    ColumnDescriptor, ColumnMeta, EntityDescriptor, FieldDescriptor, ForeignKeyRef, LinkColumn,
    LinkDescriptor, LinkMeta, ModelConfig, RelationDescriptor, RelationKind, RelationMeta,
    SchemaRegistry, map_native_type,
};

/// Everything a typical caller needs.
pub mod prelude {
    pub use relmodel_core::{
        BaseType, Direction, Error, Record, Result, StoreError, UnitOfWork, Value, record,
    };
    pub use relmodel_crud::{CrudEngine, Projector};
    pub use relmodel_query::{QueryParam, QueryParams, QueryResult};
    pub use relmodel_schema::{
        ColumnDescriptor, EntityDescriptor, LinkColumn, LinkDescriptor, RelationDescriptor,
        RelationKind, SchemaRegistry,
    };
}
