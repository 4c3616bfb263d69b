//! In-memory store driver for the relmodel engine.
//!
//! [`MemoryStore`] holds tables of plain records behind a mutex and hands
//! out [`MemoryUow`] units of work that evaluate the full select-plan
//! representation: inner joins, every filter variant, multi-key ordering,
//! and windowing. Declared unique columns are enforced on writes and
//! auto-increment identifiers are assigned on insert.
//!
//! Rollback restores a snapshot taken before the unit-of-work's first
//! write; commit publishes by dropping it. That is enough fidelity for an
//! embedded driver; it makes no attempt at isolation between concurrently
//! open units of work.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use relmodel_core::{
    ColumnRef, Direction, Filter, Record, SelectPlan, StoreError, UnitOfWork, Value,
};

/// Declaration of one table's constraints.
#[derive(Debug, Clone, Default)]
pub struct TableDef {
    name: String,
    auto_id: Option<String>,
    unique: Vec<String>,
}

impl TableDef {
    /// Declare a table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_id: None,
            unique: Vec::new(),
        }
    }

    /// Assign ascending integers to `column` when inserts omit it.
    #[must_use]
    pub fn auto_id(mut self, column: impl Into<String>) -> Self {
        self.auto_id = Some(column.into());
        self
    }

    /// Enforce uniqueness of non-null values in `column`.
    #[must_use]
    pub fn unique(mut self, column: impl Into<String>) -> Self {
        self.unique.push(column.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
struct TableState {
    rows: Vec<Record>,
    next_id: i64,
    auto_id: Option<String>,
    unique: Vec<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<String, TableState>,
}

impl StoreState {
    fn table_mut(&mut self, name: &str) -> &mut TableState {
        self.tables.entry(name.to_string()).or_default()
    }

    fn rows(&self, name: &str) -> &[Record] {
        self.tables.get(name).map_or(&[], |t| t.rows.as_slice())
    }
}

/// A shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table's constraints. Undeclared tables spring into
    /// existence on first write with no constraints.
    pub fn define_table(&self, def: TableDef) {
        let mut state = lock(&self.state);
        let table = state.table_mut(&def.name);
        table.auto_id = def.auto_id;
        table.unique = def.unique;
    }

    /// Open a unit of work over this store.
    #[must_use]
    pub fn uow(&self) -> MemoryUow {
        MemoryUow {
            state: Arc::clone(&self.state),
            snapshot: None,
        }
    }

    /// Current row count of a table, for assertions.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        lock(&self.state).rows(table).len()
    }
}

/// One unit of work over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUow {
    state: Arc<Mutex<StoreState>>,
    snapshot: Option<HashMap<String, TableState>>,
}

impl UnitOfWork for MemoryUow {
    fn insert(&mut self, table: &str, row: &Record) -> Result<Record, StoreError> {
        let mut state = lock(&self.state);
        if self.snapshot.is_none() {
            self.snapshot = Some(state.tables.clone());
        }
        let table_state = state.table_mut(table);

        let mut stored = row.clone();
        if let Some(auto_col) = table_state.auto_id.clone() {
            match stored.get(&auto_col).filter(|v| !v.is_null()) {
                Some(provided) => {
                    if let Some(i) = provided.as_i64() {
                        table_state.next_id = table_state.next_id.max(i);
                    }
                }
                None => {
                    table_state.next_id += 1;
                    stored.insert(auto_col, Value::Int(table_state.next_id));
                }
            }
        }

        for column in table_state.unique.clone() {
            let Some(candidate) = stored.get(&column).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = table_state
                .rows
                .iter()
                .any(|r| r.get(&column).is_some_and(|v| v.loose_eq(candidate)));
            if taken {
                return Err(StoreError::UniqueViolation(format!("{table}.{column}")));
            }
        }

        table_state.rows.push(stored.clone());
        tracing::trace!(table, "inserted row");
        Ok(stored)
    }

    fn fetch_one(&mut self, plan: &SelectPlan) -> Result<Option<Record>, StoreError> {
        let state = lock(&self.state);
        Ok(eval_plan(&state, plan, true).into_iter().next())
    }

    fn fetch_all(&mut self, plan: &SelectPlan) -> Result<Vec<Record>, StoreError> {
        let state = lock(&self.state);
        Ok(eval_plan(&state, plan, true))
    }

    fn count(&mut self, plan: &SelectPlan) -> Result<u64, StoreError> {
        let state = lock(&self.state);
        Ok(eval_plan(&state, plan, false).len() as u64)
    }

    fn update_where(
        &mut self,
        table: &str,
        filters: &[Filter],
        changes: &Record,
    ) -> Result<u64, StoreError> {
        let mut state = lock(&self.state);
        if self.snapshot.is_none() {
            self.snapshot = Some(state.tables.clone());
        }
        let table_state = state.table_mut(table);

        let matching: Vec<usize> = table_state
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row_matches(table, row, filters))
            .map(|(i, _)| i)
            .collect();

        for column in table_state.unique.clone() {
            let Some(new_val) = changes.get(&column).filter(|v| !v.is_null()) else {
                continue;
            };
            if matching.len() > 1 {
                return Err(StoreError::UniqueViolation(format!("{table}.{column}")));
            }
            let taken = table_state.rows.iter().enumerate().any(|(i, r)| {
                !matching.contains(&i) && r.get(&column).is_some_and(|v| v.loose_eq(new_val))
            });
            if taken {
                return Err(StoreError::UniqueViolation(format!("{table}.{column}")));
            }
        }

        for &index in &matching {
            if let Some(row) = table_state.rows.get_mut(index) {
                for (key, value) in changes {
                    row.insert(key.clone(), value.clone());
                }
            }
        }
        tracing::trace!(table, touched = matching.len(), "updated rows");
        Ok(matching.len() as u64)
    }

    fn delete_where(&mut self, table: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        let mut state = lock(&self.state);
        if self.snapshot.is_none() {
            self.snapshot = Some(state.tables.clone());
        }
        let table_state = state.table_mut(table);

        let before = table_state.rows.len();
        table_state
            .rows
            .retain(|row| !row_matches(table, row, filters));
        let removed = (before - table_state.rows.len()) as u64;
        tracing::trace!(table, removed, "deleted rows");
        Ok(removed)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(snapshot) = self.snapshot.take() {
            lock(&self.state).tables = snapshot;
        }
        Ok(())
    }
}

// ============================================================================
// Plan evaluation
// ============================================================================

type JoinContext = BTreeMap<String, Record>;

fn eval_plan(state: &StoreState, plan: &SelectPlan, apply_window: bool) -> Vec<Record> {
    let mut contexts: Vec<JoinContext> = state
        .rows(&plan.table)
        .iter()
        .map(|row| JoinContext::from([(plan.table.clone(), row.clone())]))
        .collect();

    for join in &plan.joins {
        let join_rows = state.rows(&join.table).to_vec();
        let mut next = Vec::new();
        for ctx in contexts {
            for candidate in &join_rows {
                let left = lookup(&ctx, &join.left);
                let right = candidate
                    .get(&join.right.column)
                    .cloned()
                    .unwrap_or(Value::Null);
                if !left.is_null() && left.loose_eq(&right) {
                    let mut joined = ctx.clone();
                    joined.insert(join.table.clone(), candidate.clone());
                    next.push(joined);
                }
            }
        }
        contexts = next;
    }

    contexts.retain(|ctx| plan.filters.iter().all(|filter| eval_filter(ctx, filter)));

    let mut rows: Vec<Record> = contexts
        .into_iter()
        .filter_map(|mut ctx| ctx.remove(&plan.table))
        .collect();

    if !plan.order.is_empty() {
        rows.sort_by(|a, b| compare_order(a, b, &plan.order));
    }

    if apply_window {
        if let Some(offset) = plan.offset {
            rows.drain(..rows.len().min(offset as usize));
        }
        if let Some(limit) = plan.limit {
            rows.truncate(limit as usize);
        }
    }
    rows
}

fn row_matches(table: &str, row: &Record, filters: &[Filter]) -> bool {
    let ctx = JoinContext::from([(table.to_string(), row.clone())]);
    filters.iter().all(|filter| eval_filter(&ctx, filter))
}

/// Resolve a column reference against the joined row context, descending
/// one level into JSON documents when the reference carries a path.
fn lookup(ctx: &JoinContext, colref: &ColumnRef) -> Value {
    let Some(record) = ctx.get(&colref.table) else {
        return Value::Null;
    };
    let value = record.get(&colref.column).cloned().unwrap_or(Value::Null);
    match &colref.json_path {
        Some(path) => match value {
            Value::Json(doc) => doc
                .get(path)
                .cloned()
                .map(Value::Json)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        None => value,
    }
}

fn eval_filter(ctx: &JoinContext, filter: &Filter) -> bool {
    let value = lookup(ctx, filter.column());
    match filter {
        Filter::Eq(_, rhs) => value.loose_eq(rhs),
        Filter::Gt(_, rhs) => value.compare(rhs) == Some(Ordering::Greater),
        Filter::Ge(_, rhs) => {
            matches!(value.compare(rhs), Some(Ordering::Greater | Ordering::Equal))
        }
        Filter::Lt(_, rhs) => value.compare(rhs) == Some(Ordering::Less),
        Filter::Le(_, rhs) => {
            matches!(value.compare(rhs), Some(Ordering::Less | Ordering::Equal))
        }
        Filter::In(_, items) => items.iter().any(|item| value.loose_eq(item)),
        Filter::Like(_, needle) => {
            !value.is_null() && value.to_text_lossy().contains(needle.as_str())
        }
        Filter::FindInSet(_, needle) => {
            let needle = needle.to_text_lossy();
            !value.is_null()
                && value
                    .to_text_lossy()
                    .split(',')
                    .any(|part| part.trim() == needle)
        }
        Filter::DateEq(_, rhs) => {
            matches!((value.as_date(), rhs.as_date()), (Some(a), Some(b)) if a == b)
        }
    }
}

fn compare_order(a: &Record, b: &Record, order: &[(ColumnRef, Direction)]) -> Ordering {
    for (colref, direction) in order {
        let left = a.get(&colref.column).cloned().unwrap_or(Value::Null);
        let right = b.get(&colref.column).cloned().unwrap_or(Value::Null);
        let cmp = match direction {
            Direction::Asc => left.order_cmp(&right),
            Direction::Desc => right.order_cmp(&left),
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

fn lock(state: &Arc<Mutex<StoreState>>) -> std::sync::MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
