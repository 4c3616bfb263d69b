//! Declarative query parameters and the predicate engine.
//!
//! Callers describe *what* they want (ordering directives, a typed filter
//! record, an explicit filter list, a page window) and the engine composes
//! a [`SelectPlan`](relmodel_core::SelectPlan) against the entity's cached
//! metadata. Relation filters join through resolved keys; JSON sub-keys and
//! joined relation attributes are addressed with dotted field paths.
//!
//! The pipeline is fixed: ordering, then the typed-filter pass, then the
//! explicit filter list, then the pre-pagination count. Windowing is left to
//! the caller so result materialization stays decoupled from predicate
//! composition.

pub mod engine;
pub mod params;

pub use engine::{QueryBuild, QueryEngine};
pub use params::{FilterOp, QueryParam, QueryParams, QueryResult};
