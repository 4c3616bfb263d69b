//! The schema registry: descriptor storage plus memoized introspection.
//!
//! The registry owns all metadata; entity types carry nothing. Descriptors
//! go in at registration time, [`ModelConfig`] bundles come out on first
//! access and are cached for the process lifetime. First-build races are
//! serialized by a build lock so exactly one caller introspects each entity
//! type; resolution reads sibling *descriptors*, never sibling configs, so a
//! relation reaching back into its own entity cannot re-enter a build.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use relmodel_core::{BaseType, Error, Result};

use crate::descriptor::{EntityDescriptor, FieldDescriptor};
use crate::mapper::map_native_type;
use crate::meta::{ColumnMeta, ModelConfig};
use crate::resolver::resolve_relation;

/// Registry of entity descriptors and their introspected metadata bundles.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    descriptors: RwLock<HashMap<String, Arc<EntityDescriptor>>>,
    configs: RwLock<HashMap<String, Arc<ModelConfig>>>,
    build_lock: Mutex<()>,
}

impl SchemaRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity descriptor.
    ///
    /// Field names must be unique within the entity and entity names unique
    /// within the registry; violations are schema errors.
    #[tracing::instrument(level = "debug", skip(self, descriptor), fields(entity = %descriptor.entity))]
    pub fn register(&self, descriptor: EntityDescriptor) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for field in &descriptor.fields {
            if !seen.insert(field.name()) {
                return Err(Error::schema(format!(
                    "entity `{}` declares field `{}` twice",
                    descriptor.entity,
                    field.name()
                )));
            }
        }

        let mut descriptors = write_lock(&self.descriptors);
        if descriptors.contains_key(&descriptor.entity) {
            return Err(Error::schema(format!(
                "entity `{}` is already registered",
                descriptor.entity
            )));
        }
        tracing::debug!(entity = %descriptor.entity, table = %descriptor.table, "registering entity");
        descriptors.insert(descriptor.entity.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Force-build every registered entity's metadata bundle.
    ///
    /// Call once after the last registration so unclassifiable relations
    /// surface immediately instead of on the first query that touches them.
    pub fn build_all(&self) -> Result<()> {
        let entities: Vec<String> = read_lock(&self.descriptors).keys().cloned().collect();
        for entity in entities {
            self.model_config(&entity)?;
        }
        Ok(())
    }

    /// The registered descriptor for `entity`.
    pub fn descriptor(&self, entity: &str) -> Result<Arc<EntityDescriptor>> {
        read_lock(&self.descriptors)
            .get(entity)
            .cloned()
            .ok_or_else(|| Error::schema(format!("entity `{entity}` is not registered")))
    }

    /// The metadata bundle for `entity`, building and caching it on first
    /// access. Concurrent first callers race to the build lock; exactly one
    /// introspects, the rest read the published bundle.
    pub fn model_config(&self, entity: &str) -> Result<Arc<ModelConfig>> {
        if let Some(config) = read_lock(&self.configs).get(entity) {
            return Ok(Arc::clone(config));
        }

        let _build = lock(&self.build_lock);
        // A racing builder may have published while this caller waited.
        if let Some(config) = read_lock(&self.configs).get(entity) {
            return Ok(Arc::clone(config));
        }

        let config = Arc::new(self.introspect(entity)?);
        write_lock(&self.configs).insert(entity.to_string(), Arc::clone(&config));
        Ok(config)
    }

    /// Walk an entity's declared fields into a metadata bundle.
    #[tracing::instrument(level = "debug", skip(self))]
    fn introspect(&self, entity: &str) -> Result<ModelConfig> {
        let descriptors = read_lock(&self.descriptors).clone();
        let descriptor = descriptors
            .get(entity)
            .ok_or_else(|| Error::schema(format!("entity `{entity}` is not registered")))?;

        let mut columns = std::collections::BTreeMap::new();
        let mut scalar_order = Vec::new();
        let mut field_order = Vec::new();
        let mut id_key = None;

        for field in &descriptor.fields {
            field_order.push(field.name().to_string());
            let meta = match field {
                FieldDescriptor::Column(col) => {
                    if col.primary_key && id_key.is_none() {
                        id_key = Some(col.name.clone());
                    }
                    scalar_order.push(col.name.clone());
                    ColumnMeta {
                        name: col.name.clone(),
                        base_type: map_native_type(&col.native_type),
                        native_type: col.native_type.clone(),
                        relation: None,
                    }
                }
                FieldDescriptor::Relation(rel) => ColumnMeta {
                    name: rel.name.clone(),
                    base_type: BaseType::Relation,
                    native_type: "Relation".to_string(),
                    relation: Some(resolve_relation(&descriptors, descriptor.as_ref(), rel)?),
                },
            };
            columns.insert(meta.name.clone(), meta);
        }

        tracing::debug!(
            entity,
            columns = columns.len(),
            "introspected entity metadata"
        );

        Ok(ModelConfig {
            entity: descriptor.entity.clone(),
            table: descriptor.table.clone(),
            id_key: id_key.unwrap_or_else(|| "id".to_string()),
            columns,
            scalar_order,
            field_order,
        })
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnDescriptor, RelationDescriptor};
    use crate::meta::RelationKind;

    fn registry_with_hero_team() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry
            .register(
                EntityDescriptor::new("hero", "heroes")
                    .column(ColumnDescriptor::new("id", "BigInteger").primary_key())
                    .column(ColumnDescriptor::new("name", "String").unique())
                    .column(
                        ColumnDescriptor::new("team_id", "BigInteger").references("teams", "id"),
                    )
                    .relation(RelationDescriptor::new("team", "team")),
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
    }

    #[test]
    fn rebuilding_yields_identical_metadata() {
        let registry = registry_with_hero_team();
        let first = registry.introspect("hero").expect("first build");
        let second = registry.introspect("hero").expect("second build");
        assert_eq!(first, second);

        let cached = registry.model_config("hero").expect("cached");
        assert_eq!(*cached, first);
    }

    #[test]
    fn config_is_cached_by_identity() {
        let registry = registry_with_hero_team();
        let a = registry.model_config("team").expect("build");
        let b = registry.model_config("team").expect("cached");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn build_all_fails_fast_on_bad_relations() {
        let registry = SchemaRegistry::new();
        registry
            .register(
                EntityDescriptor::new("hero", "heroes")
                    .column(ColumnDescriptor::new("id", "BigInteger").primary_key())
                    .relation(RelationDescriptor::new("team", "team")),
            )
            .expect("register hero");
        // `team` never registered: classification cannot complete.
        let err = registry.build_all().expect_err("must fail");
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = registry_with_hero_team();
        let err = registry
            .register(EntityDescriptor::new("hero", "heroes"))
            .expect_err("duplicate");
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn primary_key_becomes_id_key() {
        let registry = registry_with_hero_team();
        let config = registry.model_config("hero").expect("build");
        assert_eq!(config.id_key, "id");
        assert_eq!(config.scalar_order, vec!["id", "name", "team_id"]);
        assert_eq!(
            config.relation("team").map(|r| r.kind),
            Some(RelationKind::ManyToOne)
        );
    }

    #[test]
    fn concurrent_first_access_builds_once() {
        let registry = Arc::new(registry_with_hero_team());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                registry.model_config("hero").expect("build")
            }));
        }
        let configs: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();
        for pair in configs.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }
}
