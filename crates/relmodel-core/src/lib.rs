//! Core types and traits for the relmodel engine.
//!
//! `relmodel-core` is the **foundation layer** for the entire workspace. It
//! defines the data model and contracts that all other crates build on.
//!
//! # Role In The Architecture
//!
//! - **Data model**: [`Value`] and [`Record`] are the representation-neutral
//!   field-name-to-value records that cross every API boundary.
//! - **Contract layer**: [`UnitOfWork`] is the caller-owned store abstraction
//!   the engine executes against; [`SelectPlan`] is the query intermediate
//!   representation it consumes.
//! - **Taxonomy**: [`BaseType`] is the canonical value-domain classification
//!   for columns, and [`Error`]/[`StoreError`] carry the failure contract.
//!
//! # Who Uses This Crate
//!
//! - `relmodel-schema` classifies columns into [`BaseType`] and reports
//!   [`Error::Schema`] on unresolvable relations.
//! - `relmodel-query` composes [`SelectPlan`] values from parameter bundles.
//! - `relmodel-crud` drives [`UnitOfWork`] implementations with plans and
//!   records.
//! - Store drivers (e.g. `relmodel-memory`) implement [`UnitOfWork`] and
//!   evaluate plans.
//!
//! Most applications should use the `relmodel` facade; reach for
//! `relmodel-core` directly when writing store drivers.

pub mod error;
pub mod plan;
pub mod record;
pub mod types;
pub mod uow;
pub mod value;

pub use error::{Error, Result, StoreError};
pub use plan::{ColumnRef, Direction, Filter, Join, SelectPlan};
pub use record::Record;
pub use types::BaseType;
pub use uow::UnitOfWork;
pub use value::Value;
