//! The caller-owned unit-of-work contract.
//!
//! Every engine operation executes against exactly one unit-of-work supplied
//! by the caller, who is responsible for scoped acquisition and guaranteed
//! release (commit-or-rollback, then close) on every exit path. The engine
//! manages no pooling, transactions, timeouts, or cancellation of its own.

use crate::error::StoreError;
use crate::plan::{Filter, SelectPlan};
use crate::record::Record;

/// A transactional session scoped to one logical engine operation.
///
/// Implementations evaluate [`SelectPlan`]s (joins, filters, ordering, and
/// windowing) and perform row-level writes. All methods are synchronous;
/// concurrent callers each hold their own unit-of-work.
pub trait UnitOfWork {
    /// Insert a row and return it as stored, so store-generated defaults
    /// (auto-increment identifiers included) are visible to the caller.
    fn insert(&mut self, table: &str, row: &Record) -> Result<Record, StoreError>;

    /// Fetch at most one row matching the plan.
    fn fetch_one(&mut self, plan: &SelectPlan) -> Result<Option<Record>, StoreError>;

    /// Fetch every row matching the plan, honoring ordering and windowing.
    fn fetch_all(&mut self, plan: &SelectPlan) -> Result<Vec<Record>, StoreError>;

    /// Count rows matching the plan, ignoring any window it carries.
    fn count(&mut self, plan: &SelectPlan) -> Result<u64, StoreError>;

    /// Apply `changes` to every row of `table` matching `filters`; returns
    /// the number of rows touched.
    fn update_where(
        &mut self,
        table: &str,
        filters: &[Filter],
        changes: &Record,
    ) -> Result<u64, StoreError>;

    /// Delete every row of `table` matching `filters`; returns the number of
    /// rows removed. Matching nothing is not an error.
    fn delete_where(&mut self, table: &str, filters: &[Filter]) -> Result<u64, StoreError>;

    /// Publish all writes performed through this unit-of-work.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard all writes performed through this unit-of-work.
    fn rollback(&mut self) -> Result<(), StoreError>;
}
