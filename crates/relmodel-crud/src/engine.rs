//! Generic add/get/update/delete/query for one entity.
//!
//! Every operation runs against a caller-supplied unit-of-work as a single
//! atomic unit: writes commit on success and roll back (best effort) on any
//! error before it propagates. Uniqueness violations surface as
//! [`Error::Duplicate`]; every other store failure keeps its cause.

use std::sync::Arc;

use relmodel_core::{
    ColumnRef, Error, Filter, Record, Result, SelectPlan, UnitOfWork, Value,
};
use relmodel_query::{QueryEngine, QueryParams, QueryResult};
use relmodel_schema::{RelationKind, RelationMeta, SchemaRegistry};

use crate::project::{Projector, fetch_singular};

/// Relation-aware CRUD operations for one entity type.
#[derive(Debug, Clone)]
pub struct CrudEngine {
    registry: Arc<SchemaRegistry>,
    config: Arc<relmodel_schema::ModelConfig>,
    query: QueryEngine,
    projector: Projector,
}

impl CrudEngine {
    /// Build the engine for `entity`, introspecting its metadata if this is
    /// the first access.
    pub fn for_entity(registry: Arc<SchemaRegistry>, entity: &str) -> Result<Self> {
        let config = registry.model_config(entity)?;
        Ok(Self {
            query: QueryEngine::new(Arc::clone(&config)),
            projector: Projector::new(Arc::clone(&registry), Arc::clone(&config)),
            registry,
            config,
        })
    }

    /// The entity's metadata bundle.
    #[must_use]
    pub fn config(&self) -> &Arc<relmodel_schema::ModelConfig> {
        &self.config
    }

    /// The registry this engine resolves related entities through.
    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Insert a new row from a payload.
    ///
    /// Scalar fields are set directly. Many-to-many fields take a list of
    /// target identifiers (or target records to extract identifiers from)
    /// and attach the matching existing targets. One-to-one fields given as
    /// a nested record create the related row. Returns the reloaded row so
    /// store-generated defaults are visible.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = %self.config.entity))]
    pub fn add(&self, uow: &mut dyn UnitOfWork, payload: &Record) -> Result<Record> {
        let result = self.add_inner(uow, payload);
        if result.is_err() {
            let _ = uow.rollback();
        }
        result
    }

    fn add_inner(&self, uow: &mut dyn UnitOfWork, payload: &Record) -> Result<Record> {
        let mut row = Record::new();
        let mut link_writes: Vec<(&RelationMeta, Vec<Record>)> = Vec::new();
        let mut nested_writes: Vec<(&RelationMeta, Record)> = Vec::new();

        for (field, value) in payload {
            let Some(col) = self.config.column(field) else {
                continue;
            };
            match &col.relation {
                None => {
                    row.insert(field.clone(), value.clone());
                }
                Some(relation) => match relation.kind {
                    RelationKind::ManyToMany => {
                        if !value.is_null() {
                            link_writes.push((relation, self.resolve_targets(uow, relation, value)?));
                        }
                    }
                    RelationKind::OneToOne => {
                        if let Some(child) = object_to_record(value) {
                            nested_writes.push((relation, child));
                        }
                    }
                    RelationKind::OneToMany | RelationKind::ManyToOne => {}
                },
            }
        }

        let inserted = uow.insert(&self.config.table, &row).map_err(Error::from)?;

        for (relation, targets) in &link_writes {
            self.replace_links(uow, relation, &inserted, targets)?;
        }
        for (relation, child) in &nested_writes {
            self.create_related(uow, relation, &inserted, child)?;
        }

        uow.commit().map_err(Error::from)?;

        let id = inserted.get(&self.config.id_key).cloned().unwrap_or(Value::Null);
        tracing::debug!(entity = %self.config.entity, "added row");
        Ok(self.fetch_by_id(uow, &id)?.unwrap_or(inserted))
    }

    /// Partially update the row the payload identifies.
    ///
    /// Only fields present in the payload are touched; absent fields stay as
    /// they are. Dotted paths address one level of nested one-to-one
    /// attribute. Many-to-many fields replace the linked set wholesale;
    /// one-to-one records create the related row when missing and merge
    /// field-by-field otherwise. Returns the reloaded row.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = %self.config.entity))]
    pub fn update(&self, uow: &mut dyn UnitOfWork, payload: &Record) -> Result<Record> {
        let result = self.update_inner(uow, payload);
        if result.is_err() {
            let _ = uow.rollback();
        }
        result
    }

    fn update_inner(&self, uow: &mut dyn UnitOfWork, payload: &Record) -> Result<Record> {
        let id = self.payload_id(payload)?;
        let existing = self.fetch_by_id(uow, &id)?.ok_or_else(|| {
            Error::validation(format!(
                "no `{}` row with {} = {:?} to update",
                self.config.entity, self.config.id_key, id
            ))
        })?;

        let mut changes = Record::new();
        for (field, value) in payload {
            if let Some((head, attribute)) = field.split_once('.') {
                self.update_nested_attribute(uow, &existing, head, attribute, value)?;
                continue;
            }
            let Some(col) = self.config.column(field) else {
                continue;
            };
            match &col.relation {
                None => {
                    if field != &self.config.id_key {
                        changes.insert(field.clone(), value.clone());
                    }
                }
                Some(relation) => match relation.kind {
                    RelationKind::ManyToMany => {
                        if !value.is_null() {
                            let targets = self.resolve_targets(uow, relation, value)?;
                            self.replace_links(uow, relation, &existing, &targets)?;
                        }
                    }
                    RelationKind::OneToOne => {
                        if let Some(child) = object_to_record(value) {
                            self.merge_related(uow, relation, &existing, &child)?;
                        }
                    }
                    RelationKind::OneToMany | RelationKind::ManyToOne => {}
                },
            }
        }

        if !changes.is_empty() {
            uow.update_where(&self.config.table, &[self.id_filter(&id)], &changes)
                .map_err(Error::from)?;
        }

        uow.commit().map_err(Error::from)?;
        tracing::debug!(entity = %self.config.entity, "updated row");
        self.fetch_by_id(uow, &id)?.ok_or_else(|| {
            Error::validation(format!(
                "`{}` row disappeared during update",
                self.config.entity
            ))
        })
    }

    /// Fetch by identifier; a missing row is `None`, not an error.
    pub fn get(&self, uow: &mut dyn UnitOfWork, payload: &Record) -> Result<Option<Record>> {
        let id = self.payload_id(payload)?;
        self.fetch_by_id(uow, &id)
    }

    /// Delete by identifier; returns rows removed. Deleting an absent
    /// identifier succeeds with zero effect.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = %self.config.entity))]
    pub fn delete(&self, uow: &mut dyn UnitOfWork, payload: &Record) -> Result<u64> {
        let result = self.delete_inner(uow, payload);
        if result.is_err() {
            let _ = uow.rollback();
        }
        result
    }

    fn delete_inner(&self, uow: &mut dyn UnitOfWork, payload: &Record) -> Result<u64> {
        let id = self.payload_id(payload)?;
        let removed = uow
            .delete_where(&self.config.table, &[self.id_filter(&id)])
            .map_err(Error::from)?;
        uow.commit().map_err(Error::from)?;
        tracing::debug!(entity = %self.config.entity, removed, "deleted rows");
        Ok(removed)
    }

    /// Run a declarative query: compose, count, window, materialize, and
    /// project one page of representations.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = %self.config.entity))]
    pub fn query(&self, uow: &mut dyn UnitOfWork, params: &QueryParams) -> Result<QueryResult> {
        let build = self.query.build(uow, params)?;
        let rows = uow.fetch_all(&build.window()).map_err(Error::from)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(self.projector.full(
                uow,
                row,
                params.include.as_deref(),
                params.ex_include.as_deref(),
                params.relation_use_id,
            )?);
        }

        Ok(QueryResult {
            count: build.count,
            items,
            page: build.page,
            page_size: build.page_size,
        })
    }

    // ========================================================================
    // Relation writes
    // ========================================================================

    /// Resolve an m2m payload value (a list of identifiers, or of records
    /// carrying the target's identifier field) to the existing target rows.
    fn resolve_targets(
        &self,
        uow: &mut dyn UnitOfWork,
        relation: &RelationMeta,
        value: &Value,
    ) -> Result<Vec<Record>> {
        let items = value.as_array().ok_or_else(|| {
            Error::validation(format!(
                "relation field to `{}` expects a list of ids or records",
                relation.target
            ))
        })?;

        let mut ids = Vec::new();
        for item in items {
            match item {
                Value::Json(serde_json::Value::Object(obj)) => {
                    let id = obj
                        .get(&relation.target_id_key)
                        .cloned()
                        .map(Value::from)
                        .filter(|v| !v.is_null())
                        .ok_or_else(|| {
                            Error::validation(format!(
                                "related record is missing its `{}` identifier",
                                relation.target_id_key
                            ))
                        })?;
                    ids.push(id);
                }
                other => ids.push(other.clone()),
            }
        }
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let plan = SelectPlan::new(relation.target_table.clone()).filter(Filter::In(
            ColumnRef::new(relation.target_table.clone(), relation.target_id_key.clone()),
            ids,
        ));
        uow.fetch_all(&plan).map_err(Error::from)
    }

    /// Replace the junction rows for `source_row` with links to exactly
    /// `targets`, never a union with the prior set.
    fn replace_links(
        &self,
        uow: &mut dyn UnitOfWork,
        relation: &RelationMeta,
        source_row: &Record,
        targets: &[Record],
    ) -> Result<()> {
        let link = relation.link.as_ref().ok_or_else(|| {
            Error::schema(format!(
                "relation to `{}` has no junction metadata",
                relation.target
            ))
        })?;
        let source_val = source_row
            .get(&link.source_key)
            .cloned()
            .unwrap_or(Value::Null);

        uow.delete_where(
            &link.table,
            &[Filter::Eq(
                ColumnRef::new(link.table.clone(), link.source_secondary_key.clone()),
                source_val.clone(),
            )],
        )
        .map_err(Error::from)?;

        for target in targets {
            let mut row = Record::new();
            row.insert(link.source_secondary_key.clone(), source_val.clone());
            row.insert(
                link.target_secondary_key.clone(),
                target.get(&link.target_key).cloned().unwrap_or(Value::Null),
            );
            uow.insert(&link.table, &row).map_err(Error::from)?;
        }
        Ok(())
    }

    /// Create the related one-to-one row, wiring the foreign key on
    /// whichever side declares it.
    fn create_related(
        &self,
        uow: &mut dyn UnitOfWork,
        relation: &RelationMeta,
        parent: &Record,
        child: &Record,
    ) -> Result<Record> {
        if let Some(target_fk) = &relation.target_fk {
            let key = relation
                .source_key
                .clone()
                .unwrap_or_else(|| relation.source_id_key.clone());
            let mut row = child.clone();
            row.insert(
                target_fk.clone(),
                parent.get(&key).cloned().unwrap_or(Value::Null),
            );
            return uow.insert(&relation.target_table, &row).map_err(Error::from);
        }
        if let Some(source_fk) = &relation.source_fk {
            let inserted = uow
                .insert(&relation.target_table, child)
                .map_err(Error::from)?;
            let child_id = inserted
                .get(&relation.target_id_key)
                .cloned()
                .unwrap_or(Value::Null);
            let parent_id = parent
                .get(&self.config.id_key)
                .cloned()
                .unwrap_or(Value::Null);
            let mut change = Record::new();
            change.insert(source_fk.clone(), child_id);
            uow.update_where(&self.config.table, &[self.id_filter(&parent_id)], &change)
                .map_err(Error::from)?;
            return Ok(inserted);
        }
        Err(Error::schema(format!(
            "one-to-one relation to `{}` has no foreign key to wire",
            relation.target
        )))
    }

    /// Create-or-merge a one-to-one child record.
    fn merge_related(
        &self,
        uow: &mut dyn UnitOfWork,
        relation: &RelationMeta,
        parent: &Record,
        child: &Record,
    ) -> Result<()> {
        match fetch_singular(uow, relation, parent)? {
            None => {
                self.create_related(uow, relation, parent, child)?;
            }
            Some(related) => {
                let related_id = related
                    .get(&relation.target_id_key)
                    .cloned()
                    .unwrap_or(Value::Null);
                uow.update_where(
                    &relation.target_table,
                    &[Filter::Eq(
                        ColumnRef::new(
                            relation.target_table.clone(),
                            relation.target_id_key.clone(),
                        ),
                        related_id,
                    )],
                    child,
                )
                .map_err(Error::from)?;
            }
        }
        Ok(())
    }

    /// Handle a dotted `relation.attribute` payload path: create the related
    /// row when absent and the value is non-null, otherwise set the single
    /// attribute on the existing related row.
    fn update_nested_attribute(
        &self,
        uow: &mut dyn UnitOfWork,
        existing: &Record,
        head: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<()> {
        let Some(relation) = self.config.relation(head) else {
            return Ok(());
        };
        if relation.kind != RelationKind::OneToOne {
            return Ok(());
        }

        match fetch_singular(uow, relation, existing)? {
            None => {
                if !value.is_null() {
                    let mut child = Record::new();
                    child.insert(attribute.to_string(), value.clone());
                    self.create_related(uow, relation, existing, &child)?;
                }
            }
            Some(related) => {
                let related_id = related
                    .get(&relation.target_id_key)
                    .cloned()
                    .unwrap_or(Value::Null);
                let mut change = Record::new();
                change.insert(attribute.to_string(), value.clone());
                uow.update_where(
                    &relation.target_table,
                    &[Filter::Eq(
                        ColumnRef::new(
                            relation.target_table.clone(),
                            relation.target_id_key.clone(),
                        ),
                        related_id,
                    )],
                    &change,
                )
                .map_err(Error::from)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Lookup helpers
    // ========================================================================

    fn payload_id(&self, payload: &Record) -> Result<Value> {
        payload
            .get(&self.config.id_key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| {
                Error::validation(format!(
                    "payload must carry the `{}` identifier",
                    self.config.id_key
                ))
            })
    }

    fn id_filter(&self, id: &Value) -> Filter {
        Filter::Eq(
            ColumnRef::new(self.config.table.clone(), self.config.id_key.clone()),
            id.clone(),
        )
    }

    fn fetch_by_id(&self, uow: &mut dyn UnitOfWork, id: &Value) -> Result<Option<Record>> {
        let plan = SelectPlan::new(self.config.table.clone()).filter(self.id_filter(id));
        uow.fetch_one(&plan).map_err(Error::from)
    }
}

/// A nested-record payload value, if the value is a JSON object.
fn object_to_record(value: &Value) -> Option<Record> {
    match value {
        Value::Json(serde_json::Value::Object(map)) => Some(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        ),
        _ => None,
    }
}
