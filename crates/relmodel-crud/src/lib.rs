//! Relation-aware CRUD operations over caller-supplied units of work.
//!
//! [`CrudEngine`] implements add/get/update/delete/query for one entity
//! using its cached metadata bundle, with no per-entity code. Writes are
//! relation-aware: many-to-many payloads replace the junction row set
//! wholesale, one-to-one payloads create or merge the related row, and
//! partial updates touch only the fields present in the payload.
//!
//! [`Projector`] turns rows into shallow or relation-expanded
//! representations, composing include-then-exclude column selection.

pub mod engine;
pub mod project;

pub use engine::CrudEngine;
pub use project::Projector;
