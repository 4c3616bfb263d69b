//! Shared fixture: a hero/team/power/profile schema over the memory store.
#![allow(dead_code)]

use std::sync::Arc;

use relmodel::prelude::*;
use relmodel::{LinkColumn, LinkDescriptor};
use relmodel_memory::{MemoryStore, TableDef};

/// Registry describing heroes with one relation of every kind:
/// `hero.team` (m2o), `team.heroes` (o2m), `hero.profile` (o2o), and
/// `hero.powers` (m2m via the `hero_powers` junction).
pub fn registry() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistry::new();

    let hero_powers = || {
        LinkDescriptor::new(
            "hero_powers",
            LinkColumn::new("hero_id", "heroes", "id"),
            LinkColumn::new("power_id", "powers", "id"),
        )
    };

    registry
        .register(
            EntityDescriptor::new("hero", "heroes")
                .column(ColumnDescriptor::new("id", "BigInteger").primary_key())
                .column(ColumnDescriptor::new("name", "String").unique())
                .column(ColumnDescriptor::new("age", "Integer"))
                .column(ColumnDescriptor::new("joined_at", "DateTime"))
                .column(ColumnDescriptor::new("notes", "String"))
                .column(ColumnDescriptor::new("settings", "JSON"))
                .column(ColumnDescriptor::new("team_id", "BigInteger").references("teams", "id"))
                .relation(RelationDescriptor::new("team", "team"))
                .relation(RelationDescriptor::new("profile", "profile"))
                .relation(
                    RelationDescriptor::new("powers", "power")
                        .collection()
                        .link(hero_powers()),
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
                .relation(
                    RelationDescriptor::new("heroes", "hero")
                        .collection()
                        .link(hero_powers()),
                ),
        )
        .expect("register power");

    registry
        .register(
            EntityDescriptor::new("profile", "profiles")
                .column(ColumnDescriptor::new("id", "BigInteger").primary_key())
                .column(
                    ColumnDescriptor::new("hero_id", "BigInteger").references("heroes", "id"),
                )
                .column(ColumnDescriptor::new("bio", "Text"))
                .column(ColumnDescriptor::new("years", "Integer"))
                .relation(RelationDescriptor::new("hero", "hero")),
        )
        .expect("register profile");

    registry.build_all().expect("schema is sound");
    Arc::new(registry)
}

/// A store with constraints matching the registry.
pub fn store() -> MemoryStore {
    let store = MemoryStore::new();
    store.define_table(TableDef::new("heroes").auto_id("id").unique("name"));
    store.define_table(TableDef::new("teams").auto_id("id"));
    store.define_table(TableDef::new("powers").auto_id("id"));
    store.define_table(TableDef::new("profiles").auto_id("id"));
    store
}

/// Seed two teams, three powers, and five heroes through the engine.
pub fn seed(registry: &Arc<SchemaRegistry>, store: &MemoryStore) {
    let teams = CrudEngine::for_entity(Arc::clone(registry), "team").expect("team engine");
    let powers = CrudEngine::for_entity(Arc::clone(registry), "power").expect("power engine");
    let heroes = CrudEngine::for_entity(Arc::clone(registry), "hero").expect("hero engine");

    let mut uow = store.uow();
    for name in ["avengers", "x-force"] {
        teams.add(&mut uow, &record! { "name" => name }).expect("add team");
    }
    for name in ["flight", "strength", "speed"] {
        powers.add(&mut uow, &record! { "name" => name }).expect("add power");
    }

    let rows: [(&str, i64, &str, &str, &str, i64, Vec<Value>); 5] = [
        ("alice", 31, "2024-05-01T10:00:00", "red,blue", "dark", 1, vec![
            Value::Int(1),
            Value::Int(2),
        ]),
        ("bob", 17, "2024-06-15T08:00:00", "green", "light", 1, vec![Value::Int(2)]),
        ("carol", 45, "2024-07-01T12:00:00", "red", "dark", 2, vec![]),
        ("dave", 28, "2024-07-20T09:30:00", "blue", "light", 2, vec![Value::Int(3)]),
        ("eve", 60, "2024-08-02T16:00:00", "", "dark", 2, vec![]),
    ];
    for (name, age, joined_at, notes, theme, team_id, power_ids) in rows {
        heroes
            .add(
                &mut uow,
                &record! {
                    "name" => name,
                    "age" => age,
                    "joined_at" => joined_at,
                    "notes" => notes,
                    "settings" => Value::Json(serde_json::json!({ "theme": theme })),
                    "team_id" => team_id,
                    "powers" => power_ids,
                },
            )
            .expect("add hero");
    }
}
