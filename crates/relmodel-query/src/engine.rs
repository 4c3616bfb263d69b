//! The predicate engine: parameter bundles into select plans.
//!
//! One evolving plan is threaded through a fixed pipeline (ordering, the
//! typed-filter pass, the explicit filter list) and the pre-pagination
//! count is taken before the caller applies the page window. Relation
//! filters join through the keys the resolver recorded; nothing here reads
//! the descriptors again.

use std::sync::Arc;

use relmodel_core::{
    BaseType, ColumnRef, Direction, Error, Filter, Record, Result, SelectPlan, UnitOfWork, Value,
};
use relmodel_schema::{ModelConfig, RelationKind, RelationMeta};

use crate::params::{FilterOp, QueryParam, QueryParams};

/// A composed query: total match count, the un-windowed plan, and the echoed
/// page window for the caller to apply.
#[derive(Debug, Clone)]
pub struct QueryBuild {
    /// Rows matching the plan before pagination.
    pub count: u64,
    /// The composed plan without a window.
    pub plan: SelectPlan,
    /// Echoed page number.
    pub page: u64,
    /// Echoed page size.
    pub page_size: u64,
}

impl QueryBuild {
    /// The plan with the page window applied
    /// (`offset = (page - 1) * page_size`, `limit = page_size`).
    #[must_use]
    pub fn window(&self) -> SelectPlan {
        self.plan
            .clone()
            .offset(self.page.saturating_sub(1).saturating_mul(self.page_size))
            .limit(self.page_size)
    }
}

/// Composes select plans for one entity from declarative parameters.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    config: Arc<ModelConfig>,
}

impl QueryEngine {
    /// An engine over the given metadata bundle.
    #[must_use]
    pub fn new(config: Arc<ModelConfig>) -> Self {
        Self { config }
    }

    /// The metadata bundle this engine composes against.
    #[must_use]
    pub fn config(&self) -> &Arc<ModelConfig> {
        &self.config
    }

    /// Compose the plan and count the total matches.
    ///
    /// Windowing and materialization are the caller's responsibility; see
    /// [`QueryBuild::window`].
    #[tracing::instrument(level = "debug", skip_all, fields(entity = %self.config.entity))]
    pub fn build(
        &self,
        uow: &mut dyn UnitOfWork,
        params: &QueryParams,
    ) -> Result<QueryBuild> {
        let mut plan = SelectPlan::new(self.config.table.clone());

        if let Some(order) = &params.order {
            plan = self.apply_order(plan, order)?;
        }
        if let Some(query) = &params.query {
            plan = self.apply_typed_filter(plan, query)?;
        }
        if let Some(list) = &params.params {
            plan = self.apply_param_list(plan, list)?;
        }

        let count = uow.count(&plan).map_err(Error::from)?;
        tracing::debug!(count, filters = plan.filters.len(), "composed query plan");

        Ok(QueryBuild {
            count,
            plan,
            page: params.page,
            page_size: params.page_size,
        })
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    fn apply_order(
        &self,
        mut plan: SelectPlan,
        order: &[(String, Option<Direction>)],
    ) -> Result<SelectPlan> {
        for (name, direction) in order {
            let Some(direction) = direction else {
                continue;
            };
            if !self.config.is_scalar_column(name) {
                return Err(Error::validation(format!(
                    "cannot order by `{name}`: not a column of `{}`",
                    self.config.entity
                )));
            }
            plan = plan.order_by(ColumnRef::new(self.config.table.clone(), name), *direction);
        }
        Ok(plan)
    }

    // ========================================================================
    // Typed-filter pass
    // ========================================================================

    /// Apply implicit filters for every field *present* on the typed filter
    /// record, dispatched by canonical base type. Fields the schema does not
    /// declare are ignored.
    fn apply_typed_filter(&self, mut plan: SelectPlan, query: &Record) -> Result<SelectPlan> {
        for (name, value) in query {
            let Some(col) = self.config.column(name) else {
                continue;
            };
            let colref = ColumnRef::new(self.config.table.clone(), name);

            if col.base_type.is_scalar_filterable() {
                plan = plan.filter(scalar_typed_filter(colref, col.base_type, value));
            } else if col.base_type.is_temporal() {
                if let Some(filter_list) = temporal_typed_filters(colref, col.base_type, value) {
                    for filter in filter_list {
                        plan = plan.filter(filter);
                    }
                }
            } else if let Some(relation) = &col.relation {
                plan = apply_relation_typed_filter(plan, relation, value);
            }
            // bool/json columns take no implicit filter; address them through
            // the explicit parameter list.
        }
        Ok(plan)
    }

    // ========================================================================
    // Explicit filter list
    // ========================================================================

    fn apply_param_list(&self, mut plan: SelectPlan, list: &[QueryParam]) -> Result<SelectPlan> {
        for param in list {
            plan = self.apply_param(plan, param)?;
        }
        Ok(plan)
    }

    fn apply_param(&self, mut plan: SelectPlan, param: &QueryParam) -> Result<SelectPlan> {
        let op = FilterOp::parse(&param.op)?;
        let (name, child) = match param.name.split_once('.') {
            Some((name, child)) => (name, Some(child)),
            None => (param.name.as_str(), None),
        };

        let col = self.config.column(name).ok_or_else(|| {
            Error::validation(format!(
                "unknown filter field `{name}` on `{}`",
                self.config.entity
            ))
        })?;

        if let Some(relation) = &col.relation {
            return self.apply_relation_param(plan, name, relation, op, child, &param.value);
        }

        let colref = match child {
            Some(path) if col.base_type.is_json() => {
                ColumnRef::json_key(self.config.table.clone(), name, path)
            }
            Some(path) => {
                return Err(Error::validation(format!(
                    "field `{name}` ({}) does not support the dotted path `{name}.{path}`",
                    col.base_type
                )));
            }
            None => ColumnRef::new(self.config.table.clone(), name),
        };

        let filters = build_column_filters(colref, col.base_type, op, &param.value)?;
        for filter in filters {
            plan = plan.filter(filter);
        }
        Ok(plan)
    }

    /// Explicit filters addressing a relation field, dotted or bare.
    fn apply_relation_param(
        &self,
        mut plan: SelectPlan,
        field: &str,
        relation: &RelationMeta,
        op: FilterOp,
        child: Option<&str>,
        value: &Value,
    ) -> Result<SelectPlan> {
        if let Some(attribute) = child {
            // Joined-attribute filtering is defined for the singular kinds:
            // join the target once, then filter its column like a local one.
            if !matches!(
                relation.kind,
                RelationKind::ManyToOne | RelationKind::OneToOne
            ) {
                return Err(Error::validation(format!(
                    "dotted filter path `{field}.{attribute}` is not supported on a \
                     collection relation"
                )));
            }
            plan = join_singular_target(plan, relation);
            let colref = ColumnRef::new(relation.target_table.clone(), attribute);
            // The joined attribute's own type is not introspected here;
            // values compare verbatim.
            let filters = build_column_filters(colref, BaseType::Any, op, value)?;
            for filter in filters {
                plan = plan.filter(filter);
            }
            return Ok(plan);
        }

        // Bare relation filters only have meaning through a junction.
        let RelationKind::ManyToMany = relation.kind else {
            return Err(Error::validation(format!(
                "bare filter on relation `{field}` ({}) is undefined; use a junction \
                 relation or a dotted attribute path",
                relation.kind
            )));
        };
        let Some(link) = &relation.link else {
            return Err(Error::validation(format!(
                "relation `{field}` has no junction metadata"
            )));
        };

        if !plan.involves(&link.table) {
            plan = plan.join(
                link.table.clone(),
                ColumnRef::new(relation.source_table.clone(), link.source_key.clone()),
                ColumnRef::new(link.table.clone(), link.source_secondary_key.clone()),
            );
        }
        let junction_target = ColumnRef::new(link.table.clone(), link.target_secondary_key.clone());

        match op {
            FilterOp::Eq => Ok(plan.filter(Filter::Eq(junction_target, value.clone()))),
            FilterOp::In => match value.as_array() {
                Some(items) => Ok(plan.filter(Filter::In(junction_target, items.to_vec()))),
                None => Ok(plan.filter(Filter::Eq(junction_target, value.clone()))),
            },
            _ => Err(Error::validation(format!(
                "operator `{}` is not defined on relation `{field}`",
                param_op_name(op)
            ))),
        }
    }
}

// ============================================================================
// Filter construction helpers
// ============================================================================

/// Typed-filter dispatch for int/float/enum/any/str columns: non-empty list
/// means membership, a non-empty string on a text column means substring,
/// anything else means equality.
fn scalar_typed_filter(colref: ColumnRef, base_type: BaseType, value: &Value) -> Filter {
    if let Some(items) = value.as_array() {
        if !items.is_empty() {
            return Filter::In(colref, items.to_vec());
        }
    }
    if base_type == BaseType::Str {
        if let Some(text) = value.as_str() {
            if !text.is_empty() {
                return Filter::Like(colref, text.to_string());
            }
        }
    }
    Filter::Eq(colref, value.clone())
}

/// Typed-filter dispatch for the date/time family: a two-element list is an
/// inclusive range with either bound omittable, a datetime scalar compares
/// by date portion, other scalars compare for equality. Null is skipped.
fn temporal_typed_filters(
    colref: ColumnRef,
    base_type: BaseType,
    value: &Value,
) -> Option<Vec<Filter>> {
    match value {
        Value::Null => None,
        Value::Array(bounds) => {
            if bounds.len() != 2 {
                return None;
            }
            let mut filters = Vec::new();
            if !bounds[0].is_null() {
                filters.push(Filter::Ge(colref.clone(), bounds[0].clone()));
            }
            if !bounds[1].is_null() {
                filters.push(Filter::Le(colref, bounds[1].clone()));
            }
            Some(filters)
        }
        scalar => {
            let filter = if base_type == BaseType::DateTime {
                Filter::DateEq(colref, scalar.clone())
            } else {
                Filter::Eq(colref, scalar.clone())
            };
            Some(vec![filter])
        }
    }
}

/// Typed-filter dispatch for relation fields: m2m joins the junction and
/// filters its target key, o2m joins the target and filters its identifier.
/// The singular kinds take no implicit filter.
fn apply_relation_typed_filter(
    mut plan: SelectPlan,
    relation: &RelationMeta,
    value: &Value,
) -> SelectPlan {
    match relation.kind {
        RelationKind::ManyToMany => {
            let Some(link) = &relation.link else {
                return plan;
            };
            if !plan.involves(&link.table) {
                plan = plan.join(
                    link.table.clone(),
                    ColumnRef::new(relation.source_table.clone(), link.source_key.clone()),
                    ColumnRef::new(link.table.clone(), link.source_secondary_key.clone()),
                );
            }
            let colref =
                ColumnRef::new(link.table.clone(), link.target_secondary_key.clone());
            plan.filter(membership_or_equality(colref, value))
        }
        RelationKind::OneToMany => {
            let (Some(source_key), Some(target_fk)) =
                (&relation.source_key, &relation.target_fk)
            else {
                return plan;
            };
            if !plan.involves(&relation.target_table) {
                plan = plan.join(
                    relation.target_table.clone(),
                    ColumnRef::new(relation.source_table.clone(), source_key.clone()),
                    ColumnRef::new(relation.target_table.clone(), target_fk.clone()),
                );
            }
            let colref = ColumnRef::new(
                relation.target_table.clone(),
                relation.target_id_key.clone(),
            );
            plan.filter(membership_or_equality(colref, value))
        }
        RelationKind::ManyToOne | RelationKind::OneToOne => plan,
    }
}

fn membership_or_equality(colref: ColumnRef, value: &Value) -> Filter {
    match value.as_array() {
        Some(items) if !items.is_empty() => Filter::In(colref, items.to_vec()),
        _ => Filter::Eq(colref, value.clone()),
    }
}

/// Join the target of a singular relation, preferring the explicit source
/// foreign key and falling back to the target-side key pair.
fn join_singular_target(mut plan: SelectPlan, relation: &RelationMeta) -> SelectPlan {
    if plan.involves(&relation.target_table) {
        return plan;
    }
    if let Some(source_fk) = &relation.source_fk {
        plan = plan.join(
            relation.target_table.clone(),
            ColumnRef::new(relation.source_table.clone(), source_fk.clone()),
            ColumnRef::new(
                relation.target_table.clone(),
                relation.target_id_key.clone(),
            ),
        );
    } else if let (Some(source_key), Some(target_fk)) =
        (&relation.source_key, &relation.target_fk)
    {
        plan = plan.join(
            relation.target_table.clone(),
            ColumnRef::new(relation.source_table.clone(), source_key.clone()),
            ColumnRef::new(relation.target_table.clone(), target_fk.clone()),
        );
    }
    plan
}

/// Build the filters for one explicit parameter against a plain column.
fn build_column_filters(
    colref: ColumnRef,
    base_type: BaseType,
    op: FilterOp,
    value: &Value,
) -> Result<Vec<Filter>> {
    let filters = match op {
        FilterOp::Eq => {
            if base_type.is_json() {
                let serialized = serde_json::to_string(value)
                    .map_err(|e| Error::validation(format!("unserializable filter value: {e}")))?;
                vec![Filter::Eq(colref, Value::Text(serialized))]
            } else if base_type == BaseType::DateTime {
                vec![Filter::DateEq(colref, value.clone())]
            } else {
                vec![Filter::Eq(colref, value.clone())]
            }
        }
        FilterOp::Gt => vec![Filter::Gt(colref, value.clone())],
        FilterOp::Ge => vec![Filter::Ge(colref, value.clone())],
        FilterOp::Lt => vec![Filter::Lt(colref, value.clone())],
        FilterOp::Le => vec![Filter::Le(colref, value.clone())],
        FilterOp::In => {
            let items = value.as_array().ok_or_else(|| {
                Error::validation(format!(
                    "`in` on `{}` requires a list value",
                    colref_name(&colref)
                ))
            })?;
            vec![Filter::In(colref, items.to_vec())]
        }
        FilterOp::Like => vec![Filter::Like(colref, value.to_text_lossy())],
        FilterOp::FindInSet => vec![Filter::FindInSet(colref, value.clone())],
        FilterOp::Range => range_filters(colref, value)?,
    };
    Ok(filters)
}

/// An inclusive range from a 1–2 element bound list; either bound may be
/// null to leave that side open.
fn range_filters(colref: ColumnRef, value: &Value) -> Result<Vec<Filter>> {
    let bounds = value.as_array().ok_or_else(|| {
        Error::validation(format!(
            "`range` on `{}` requires a list of one or two bounds",
            colref_name(&colref)
        ))
    })?;
    if bounds.is_empty() || bounds.len() > 2 {
        return Err(Error::validation(format!(
            "`range` on `{}` takes one or two bounds, got {}",
            colref_name(&colref),
            bounds.len()
        )));
    }

    let mut filters = Vec::new();
    if !bounds[0].is_null() {
        filters.push(Filter::Ge(colref.clone(), bounds[0].clone()));
    }
    if let Some(upper) = bounds.get(1) {
        if !upper.is_null() {
            filters.push(Filter::Le(colref, upper.clone()));
        }
    }
    Ok(filters)
}

fn colref_name(colref: &ColumnRef) -> String {
    match &colref.json_path {
        Some(path) => format!("{}.{}", colref.column, path),
        None => colref.column.clone(),
    }
}

fn param_op_name(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Gt => ">",
        FilterOp::Ge => ">=",
        FilterOp::Lt => "<",
        FilterOp::Le => "<=",
        FilterOp::In => "in",
        FilterOp::Like => "like",
        FilterOp::FindInSet => "find_in_set",
        FilterOp::Range => "range",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmodel_schema::{
        ColumnDescriptor, EntityDescriptor, LinkColumn, LinkDescriptor, RelationDescriptor,
        SchemaRegistry,
    };

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry
            .register(
                EntityDescriptor::new("hero", "heroes")
                    .column(ColumnDescriptor::new("id", "BigInteger").primary_key())
                    .column(ColumnDescriptor::new("name", "String"))
                    .column(ColumnDescriptor::new("age", "Integer"))
                    .column(ColumnDescriptor::new("joined_at", "DateTime"))
                    .column(ColumnDescriptor::new("settings", "JSON"))
                    .column(
                        ColumnDescriptor::new("team_id", "BigInteger").references("teams", "id"),
                    )
                    .relation(RelationDescriptor::new("team", "team"))
                    .relation(
                        RelationDescriptor::new("powers", "power").collection().link(
                            LinkDescriptor::new(
                                "hero_powers",
                                LinkColumn::new("hero_id", "heroes", "id"),
                                LinkColumn::new("power_id", "powers", "id"),
                            ),
                        ),
                    ),
            )
            .expect("register hero");
        registry
            .register(
                EntityDescriptor::new("team", "teams")
                    .column(ColumnDescriptor::new("id", "BigInteger").primary_key())
                    .column(ColumnDescriptor::new("name", "String"))
                    .relation(RelationDescriptor::new("heroes", "hero").collection()),
            )
            .expect("register team");
        registry
            .register(
                EntityDescriptor::new("power", "powers")
                    .column(ColumnDescriptor::new("id", "BigInteger").primary_key())
                    .column(ColumnDescriptor::new("name", "String"))
                    .relation(RelationDescriptor::new("heroes", "hero").collection()),
            )
            .expect("register power");
        registry
    }

    fn hero_engine() -> QueryEngine {
        QueryEngine::new(registry().model_config("hero").expect("hero config"))
    }

    fn apply(engine: &QueryEngine, params: &QueryParams) -> Result<SelectPlan> {
        let mut plan = SelectPlan::new(engine.config.table.clone());
        if let Some(order) = &params.order {
            plan = engine.apply_order(plan, order)?;
        }
        if let Some(query) = &params.query {
            plan = engine.apply_typed_filter(plan, query)?;
        }
        if let Some(list) = &params.params {
            plan = engine.apply_param_list(plan, list)?;
        }
        Ok(plan)
    }

    #[test]
    fn null_direction_adds_no_ordering() {
        let engine = hero_engine();
        let params = QueryParams::default()
            .order_by("name", Some(Direction::Desc))
            .order_by("age", None);
        let plan = apply(&engine, &params).expect("plan");
        assert_eq!(plan.order.len(), 1);
        assert_eq!(plan.order[0].0.column, "name");
    }

    #[test]
    fn ordering_by_unknown_column_is_validation_error() {
        let engine = hero_engine();
        let params = QueryParams::default().order_by("nope", Some(Direction::Asc));
        assert!(matches!(
            apply(&engine, &params),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn typed_filter_dispatches_by_base_type() {
        let engine = hero_engine();
        let params = QueryParams::default().query_record(relmodel_core::record! {
            "age" => vec![Value::Int(30), Value::Int(40)],
            "name" => "man",
        });
        let plan = apply(&engine, &params).expect("plan");
        assert!(plan
            .filters
            .iter()
            .any(|f| matches!(f, Filter::In(c, items) if c.column == "age" && items.len() == 2)));
        assert!(plan
            .filters
            .iter()
            .any(|f| matches!(f, Filter::Like(c, s) if c.column == "name" && s == "man")));
    }

    #[test]
    fn typed_datetime_scalar_compares_date_portion() {
        let engine = hero_engine();
        let params = QueryParams::default()
            .query_record(relmodel_core::record! { "joined_at" => "2024-05-01" });
        let plan = apply(&engine, &params).expect("plan");
        assert!(matches!(&plan.filters[0], Filter::DateEq(c, _) if c.column == "joined_at"));
    }

    #[test]
    fn typed_temporal_range_bounds_are_nullable() {
        let engine = hero_engine();
        let params = QueryParams::default().query_record(relmodel_core::record! {
            "joined_at" => vec![Value::Null, Value::Text("2024-06-01".to_string())],
        });
        let plan = apply(&engine, &params).expect("plan");
        assert_eq!(plan.filters.len(), 1);
        assert!(matches!(&plan.filters[0], Filter::Le(c, _) if c.column == "joined_at"));
    }

    #[test]
    fn typed_m2m_filter_joins_junction() {
        let engine = hero_engine();
        let params = QueryParams::default()
            .query_record(relmodel_core::record! { "powers" => vec![Value::Int(1), Value::Int(2)] });
        let plan = apply(&engine, &params).expect("plan");
        assert!(plan.involves("hero_powers"));
        assert!(matches!(
            &plan.filters[0],
            Filter::In(c, _) if c.table == "hero_powers" && c.column == "power_id"
        ));
    }

    #[test]
    fn explicit_json_subkey_filter() {
        let engine = hero_engine();
        let params =
            QueryParams::default().param(QueryParam::new("settings.theme", "=", "dark"));
        let plan = apply(&engine, &params).expect("plan");
        let Filter::Eq(colref, Value::Text(serialized)) = &plan.filters[0] else {
            panic!("expected serialized equality, got {:?}", plan.filters[0]);
        };
        assert_eq!(colref.json_path.as_deref(), Some("theme"));
        assert_eq!(serialized, "\"dark\"");
    }

    #[test]
    fn explicit_relation_attribute_joins_target() {
        let engine = hero_engine();
        let params = QueryParams::default().param(QueryParam::new("team.name", "=", "avengers"));
        let plan = apply(&engine, &params).expect("plan");
        assert!(plan.involves("teams"));
        assert!(matches!(
            &plan.filters[0],
            Filter::Eq(c, _) if c.table == "teams" && c.column == "name"
        ));
        // Joined via the declared foreign key on the source side.
        assert_eq!(plan.joins[0].left.column, "team_id");
        assert_eq!(plan.joins[0].right.column, "id");
    }

    #[test]
    fn bare_equality_on_m2m_joins_junction() {
        let engine = hero_engine();
        let params = QueryParams::default().param(QueryParam::new("powers", "=", 3));
        let plan = apply(&engine, &params).expect("plan");
        assert!(plan.involves("hero_powers"));
        assert!(matches!(
            &plan.filters[0],
            Filter::Eq(c, Value::Int(3)) if c.column == "power_id"
        ));
    }

    #[test]
    fn bare_equality_on_singular_relation_is_validation_error() {
        let engine = hero_engine();
        let params = QueryParams::default().param(QueryParam::new("team", "=", 3));
        assert!(matches!(
            apply(&engine, &params),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn unknown_operator_is_validation_error() {
        let engine = hero_engine();
        let params = QueryParams::default().param(QueryParam::new("age", "between", 3));
        assert!(matches!(
            apply(&engine, &params),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn one_sided_range() {
        let engine = hero_engine();
        let params = QueryParams::default().param(QueryParam::new(
            "age",
            "range",
            vec![Value::Int(18), Value::Null],
        ));
        let plan = apply(&engine, &params).expect("plan");
        assert_eq!(plan.filters.len(), 1);
        assert!(matches!(
            &plan.filters[0],
            Filter::Ge(c, Value::Int(18)) if c.column == "age"
        ));
    }

    #[test]
    fn dotted_path_on_plain_column_is_validation_error() {
        let engine = hero_engine();
        let params = QueryParams::default().param(QueryParam::new("age.nested", "=", 3));
        assert!(matches!(
            apply(&engine, &params),
            Err(Error::Validation(_))
        ));
    }
}
