//! Select-plan intermediate representation.
//!
//! The engine never renders SQL. It composes queries as data (joins,
//! filters, sort keys, and a window) and hands the plan to the caller's
//! [`UnitOfWork`](crate::UnitOfWork), which owns execution. Keeping the plan
//! declarative lets drivers attach their own loading policy without the
//! predicate composition knowing about it.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A reference to a column, optionally into a JSON sub-key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Table (or junction table) holding the column.
    pub table: String,
    /// Column name.
    pub column: String,
    /// One-level path into a json/jsonb column.
    pub json_path: Option<String>,
}

impl ColumnRef {
    /// Reference a plain column.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            json_path: None,
        }
    }

    /// Reference a sub-key of a JSON column.
    #[must_use]
    pub fn json_key(
        table: impl Into<String>,
        column: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            json_path: Some(path.into()),
        }
    }
}

/// Sort direction for one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// A single predicate over a column reference.
///
/// All comparisons are inclusive where bounded and evaluate to false on
/// incomparable values rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Column equals value. Temporal columns compare fully; see [`Filter::DateEq`]
    /// for date-portion equality.
    Eq(ColumnRef, Value),
    /// Column strictly greater than value.
    Gt(ColumnRef, Value),
    /// Column greater than or equal to value.
    Ge(ColumnRef, Value),
    /// Column strictly less than value.
    Lt(ColumnRef, Value),
    /// Column less than or equal to value.
    Le(ColumnRef, Value),
    /// Column is a member of the value list.
    In(ColumnRef, Vec<Value>),
    /// Case-sensitive substring match on the stringified column.
    Like(ColumnRef, String),
    /// Value is a member of the comma-joined column text.
    FindInSet(ColumnRef, Value),
    /// Date portions are equal, time-of-day ignored.
    DateEq(ColumnRef, Value),
}

impl Filter {
    /// The column this predicate tests.
    #[must_use]
    pub fn column(&self) -> &ColumnRef {
        match self {
            Filter::Eq(c, _)
            | Filter::Gt(c, _)
            | Filter::Ge(c, _)
            | Filter::Lt(c, _)
            | Filter::Le(c, _)
            | Filter::In(c, _)
            | Filter::Like(c, _)
            | Filter::FindInSet(c, _)
            | Filter::DateEq(c, _) => c,
        }
    }
}

/// An inner join against another table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Table joined in.
    pub table: String,
    /// Column on the already-joined side.
    pub left: ColumnRef,
    /// Column on the newly-joined table.
    pub right: ColumnRef,
}

/// A composable select plan: base table, joins, conjunctive filters,
/// ordering keys in application order, and an optional window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectPlan {
    /// Base table the plan selects rows from.
    pub table: String,
    /// Inner joins, applied in order.
    pub joins: Vec<Join>,
    /// Conjunctive predicates.
    pub filters: Vec<Filter>,
    /// Ordering keys, composed in the order supplied.
    pub order: Vec<(ColumnRef, Direction)>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Maximum rows to return.
    pub limit: Option<u64>,
}

impl SelectPlan {
    /// A plan selecting every row of `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            joins: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Add a predicate.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Join `table` on `left = right`.
    #[must_use]
    pub fn join(
        mut self,
        table: impl Into<String>,
        left: ColumnRef,
        right: ColumnRef,
    ) -> Self {
        self.joins.push(Join {
            table: table.into(),
            left,
            right,
        });
        self
    }

    /// True if `table` is the base table or already joined.
    #[must_use]
    pub fn involves(&self, table: &str) -> bool {
        self.table == table || self.joins.iter().any(|j| j.table == table)
    }

    /// Append an ordering key.
    #[must_use]
    pub fn order_by(mut self, column: ColumnRef, direction: Direction) -> Self {
        self.order.push((column, direction));
        self
    }

    /// Set the window offset.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the window limit.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_builder_composes_in_order() {
        let plan = SelectPlan::new("users")
            .filter(Filter::Ge(ColumnRef::new("users", "age"), Value::Int(18)))
            .order_by(ColumnRef::new("users", "name"), Direction::Asc)
            .offset(10)
            .limit(5);

        assert_eq!(plan.table, "users");
        assert_eq!(plan.filters.len(), 1);
        assert_eq!(plan.order.len(), 1);
        assert_eq!(plan.offset, Some(10));
        assert_eq!(plan.limit, Some(5));
    }

    #[test]
    fn involves_sees_joined_tables() {
        let plan = SelectPlan::new("users").join(
            "user_tags",
            ColumnRef::new("users", "id"),
            ColumnRef::new("user_tags", "user_id"),
        );
        assert!(plan.involves("users"));
        assert!(plan.involves("user_tags"));
        assert!(!plan.involves("tags"));
    }
}
