//! Request-scoped query parameter bundles.

use relmodel_core::{Direction, Error, Record, Result, Value};
use serde::{Deserialize, Serialize};

/// Operator of one explicit filter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Equality (`=` / `==`).
    Eq,
    /// Strictly greater (`>`).
    Gt,
    /// Greater or equal (`>=`).
    Ge,
    /// Strictly less (`<`).
    Lt,
    /// Less or equal (`<=`).
    Le,
    /// Membership in a list (`in`).
    In,
    /// Case-sensitive substring (`like`).
    Like,
    /// Membership in a delimiter-joined column (`find_in_set`).
    FindInSet,
    /// Inclusive range with nullable bounds (`range`).
    Range,
}

impl FilterOp {
    /// Parse the wire spelling of an operator.
    pub fn parse(op: &str) -> Result<Self> {
        Ok(match op {
            "=" | "==" => FilterOp::Eq,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Ge,
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Le,
            "in" => FilterOp::In,
            "like" => FilterOp::Like,
            "find_in_set" => FilterOp::FindInSet,
            "range" => FilterOp::Range,
            other => {
                return Err(Error::validation(format!("unknown filter operator `{other}`")));
            }
        })
    }
}

/// One explicit filter: a field path, an operator spelling, and a value.
///
/// The field may be dotted to address a JSON sub-key (`settings.theme`) or a
/// joined relation attribute (`team.name`). The operator is validated when
/// the query is built, so malformed requests fail as validation errors
/// rather than at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    /// Field path.
    pub name: String,
    /// Operator spelling (`=`, `>=`, `in`, `range`, ...).
    #[serde(rename = "type")]
    pub op: String,
    /// Operand; a list for `in` and `range`.
    #[serde(default)]
    pub value: Value,
}

impl QueryParam {
    /// Build a filter parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            op: op.into(),
            value: value.into(),
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    10
}

/// The full declarative specification of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Explicit filter list, applied after the typed filter.
    #[serde(default)]
    pub params: Option<Vec<QueryParam>>,
    /// Ordering directives in application order; a `None` direction means no
    /// ordering for that key.
    #[serde(default)]
    pub order: Option<Vec<(String, Option<Direction>)>>,
    /// Typed filter record: only fields *present* here filter, dispatched by
    /// the column's canonical base type.
    #[serde(default)]
    pub query: Option<Record>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u64,
    /// Rows per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Projection include-list; narrows output to the named columns.
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// Projection exclude-list; removes named columns after `include`.
    #[serde(default)]
    pub ex_include: Option<Vec<String>>,
    /// Render collection relations as identifier lists instead of shallow
    /// records.
    #[serde(default)]
    pub relation_use_id: bool,
}

impl QueryParams {
    /// Parameters selecting page `page` of size `page_size` with no filters.
    #[must_use]
    pub fn page(page: u64, page_size: u64) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    /// Add an explicit filter parameter.
    #[must_use]
    pub fn param(mut self, param: QueryParam) -> Self {
        self.params.get_or_insert_with(Vec::new).push(param);
        self
    }

    /// Add an ordering directive.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Option<Direction>) -> Self {
        self.order
            .get_or_insert_with(Vec::new)
            .push((column.into(), direction));
        self
    }

    /// Set the typed filter record.
    #[must_use]
    pub fn query_record(mut self, query: Record) -> Self {
        self.query = Some(query);
        self
    }

    /// Render collection relations as identifier lists.
    #[must_use]
    pub fn relation_ids(mut self) -> Self {
        self.relation_use_id = true;
        self
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            params: None,
            order: None,
            query: None,
            page: default_page(),
            page_size: default_page_size(),
            include: None,
            ex_include: None,
            relation_use_id: false,
        }
    }
}

/// One page of query results plus the pre-pagination total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Total matching rows, independent of the page window.
    pub count: u64,
    /// The page-window slice of representations.
    pub items: Vec<Record>,
    /// Echoed page number.
    pub page: u64,
    /// Echoed page size.
    pub page_size: u64,
}
