//! Row-to-representation projection.
//!
//! Shallow mode renders only the declared physical columns. Full mode
//! expands relations: collection kinds become a sequence of target
//! identifiers or target shallow records, singular kinds a single shallow
//! record or null. Column selection composes include-before-exclude.

use std::sync::Arc;

use relmodel_core::{
    ColumnRef, Error, Filter, Record, Result, SelectPlan, UnitOfWork, Value,
};
use relmodel_schema::{ModelConfig, RelationKind, RelationMeta, SchemaRegistry};

/// Projects rows of one entity into caller-facing representations.
#[derive(Debug, Clone)]
pub struct Projector {
    registry: Arc<SchemaRegistry>,
    config: Arc<ModelConfig>,
}

impl Projector {
    /// A projector for the entity described by `config`.
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>, config: Arc<ModelConfig>) -> Self {
        Self { registry, config }
    }

    /// Shallow representation: declared physical columns only, no relation
    /// expansion. Missing columns render as null.
    #[must_use]
    pub fn shallow(
        &self,
        row: &Record,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
    ) -> Record {
        merge_columns(&self.config.scalar_order, include, exclude)
            .into_iter()
            .map(|name| {
                let value = row.get(&name).cloned().unwrap_or(Value::Null);
                (name, value)
            })
            .collect()
    }

    /// Full representation: every selected column including relations.
    ///
    /// With `relation_use_id`, collection relations render as identifier
    /// lists; otherwise as target shallow records. Singular relations render
    /// as one target shallow record or null either way.
    pub fn full(
        &self,
        uow: &mut dyn UnitOfWork,
        row: &Record,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
        relation_use_id: bool,
    ) -> Result<Record> {
        let mut out = Record::new();
        for name in merge_columns(&self.config.field_order, include, exclude) {
            let Some(col) = self.config.column(&name) else {
                continue;
            };
            let value = match &col.relation {
                None => row.get(&name).cloned().unwrap_or(Value::Null),
                Some(relation) => {
                    self.project_relation(uow, relation, row, relation_use_id)?
                }
            };
            out.insert(name, value);
        }
        Ok(out)
    }

    fn project_relation(
        &self,
        uow: &mut dyn UnitOfWork,
        relation: &RelationMeta,
        row: &Record,
        use_id: bool,
    ) -> Result<Value> {
        match relation.kind {
            RelationKind::ManyToMany => {
                let Some(link) = &relation.link else {
                    return Ok(Value::Array(Vec::new()));
                };
                let Some(source_val) = row.get(&link.source_key).filter(|v| !v.is_null())
                else {
                    return Ok(Value::Array(Vec::new()));
                };
                let plan = SelectPlan::new(relation.target_table.clone())
                    .join(
                        link.table.clone(),
                        ColumnRef::new(relation.target_table.clone(), link.target_key.clone()),
                        ColumnRef::new(link.table.clone(), link.target_secondary_key.clone()),
                    )
                    .filter(Filter::Eq(
                        ColumnRef::new(link.table.clone(), link.source_secondary_key.clone()),
                        source_val.clone(),
                    ));
                let targets = uow.fetch_all(&plan).map_err(Error::from)?;
                self.render_collection(relation, &targets, use_id)
            }
            RelationKind::OneToMany => {
                let (Some(source_key), Some(target_fk)) =
                    (&relation.source_key, &relation.target_fk)
                else {
                    return Ok(Value::Array(Vec::new()));
                };
                let Some(source_val) = row.get(source_key).filter(|v| !v.is_null()) else {
                    return Ok(Value::Array(Vec::new()));
                };
                let plan = SelectPlan::new(relation.target_table.clone()).filter(Filter::Eq(
                    ColumnRef::new(relation.target_table.clone(), target_fk.clone()),
                    source_val.clone(),
                ));
                let targets = uow.fetch_all(&plan).map_err(Error::from)?;
                self.render_collection(relation, &targets, use_id)
            }
            RelationKind::OneToOne | RelationKind::ManyToOne => {
                match fetch_singular(uow, relation, row)? {
                    Some(related) => self.render_target(relation, &related),
                    None => Ok(Value::Null),
                }
            }
        }
    }

    fn render_collection(
        &self,
        relation: &RelationMeta,
        targets: &[Record],
        use_id: bool,
    ) -> Result<Value> {
        if use_id {
            let ids = targets
                .iter()
                .map(|t| t.get(&relation.target_id_key).cloned().unwrap_or(Value::Null))
                .collect();
            return Ok(Value::Array(ids));
        }
        let items = targets
            .iter()
            .map(|t| self.render_target(relation, t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    /// A target row as a shallow record, embedded as a JSON value.
    fn render_target(&self, relation: &RelationMeta, target: &Record) -> Result<Value> {
        let target_config = self.registry.model_config(&relation.target)?;
        let projector = Projector::new(Arc::clone(&self.registry), target_config);
        let shallow = projector.shallow(target, None, None);
        let doc = serde_json::to_value(&shallow)
            .map_err(|e| Error::validation(format!("unserializable related row: {e}")))?;
        Ok(Value::Json(doc))
    }
}

/// Include narrows to the named columns first; exclude then removes names
/// from what remains.
pub(crate) fn merge_columns(
    all: &[String],
    include: Option<&[String]>,
    exclude: Option<&[String]>,
) -> Vec<String> {
    let mut columns: Vec<String> = match include {
        Some(include) => include
            .iter()
            .filter(|name| all.contains(name))
            .cloned()
            .collect(),
        None => all.to_vec(),
    };
    if let Some(exclude) = exclude {
        columns.retain(|name| !exclude.contains(name));
    }
    columns
}

/// Fetch the single related row of a one-to-one or many-to-one relation,
/// preferring the source-side foreign key.
pub(crate) fn fetch_singular(
    uow: &mut dyn UnitOfWork,
    relation: &RelationMeta,
    row: &Record,
) -> Result<Option<Record>> {
    if let Some(source_fk) = &relation.source_fk {
        let Some(fk_val) = row.get(source_fk).filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let plan = SelectPlan::new(relation.target_table.clone()).filter(Filter::Eq(
            ColumnRef::new(relation.target_table.clone(), relation.target_id_key.clone()),
            fk_val.clone(),
        ));
        return uow.fetch_one(&plan).map_err(Error::from);
    }
    if let (Some(source_key), Some(target_fk)) = (&relation.source_key, &relation.target_fk) {
        let Some(key_val) = row.get(source_key).filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let plan = SelectPlan::new(relation.target_table.clone()).filter(Filter::Eq(
            ColumnRef::new(relation.target_table.clone(), target_fk.clone()),
            key_val.clone(),
        ));
        return uow.fetch_one(&plan).map_err(Error::from);
    }
    Ok(None)
}
