//! CRUD semantics: partial updates, relation-aware writes, and the error
//! contract.

mod common;

use std::sync::Arc;

use relmodel::prelude::*;

fn hero_engine(registry: &Arc<SchemaRegistry>) -> CrudEngine {
    CrudEngine::for_entity(Arc::clone(registry), "hero").expect("hero engine")
}

#[test]
fn add_returns_the_materialized_row() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    let row = heroes
        .add(&mut uow, &record! { "name" => "logan", "age" => 44 })
        .expect("add");

    // The identifier was store-generated and is visible in the result.
    assert_eq!(row.get("id"), Some(&Value::Int(1)));
    assert_eq!(row.get("name"), Some(&Value::Text("logan".to_string())));
}

#[test]
fn partial_update_leaves_absent_fields_untouched() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    let row = heroes
        .add(&mut uow, &record! { "name" => "a", "age" => 10 })
        .expect("add");
    let id = row.get("id").cloned().expect("id");

    let updated = heroes
        .update(&mut uow, &record! { "id" => id, "name" => "b" })
        .expect("update");

    assert_eq!(updated.get("name"), Some(&Value::Text("b".to_string())));
    assert_eq!(updated.get("age"), Some(&Value::Int(10)));
}

#[test]
fn m2m_update_replaces_the_linked_set_wholesale() {
    let registry = common::registry();
    let store = common::store();
    common::seed(&registry, &store);
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    // alice starts linked to powers [1, 2].
    let result = heroes
        .query(
            &mut uow,
            &QueryParams::default()
                .param(QueryParam::new("name", "=", "alice"))
                .relation_ids(),
        )
        .expect("query alice");
    let alice = &result.items[0];
    assert_eq!(
        alice.get("powers"),
        Some(&Value::Array(vec![Value::Int(1), Value::Int(2)]))
    );
    let id = alice.get("id").cloned().expect("id");

    heroes
        .update(
            &mut uow,
            &record! { "id" => id, "powers" => vec![Value::Int(3)] },
        )
        .expect("update");

    let result = heroes
        .query(
            &mut uow,
            &QueryParams::default()
                .param(QueryParam::new("name", "=", "alice"))
                .relation_ids(),
        )
        .expect("query alice again");
    assert_eq!(
        result.items[0].get("powers"),
        Some(&Value::Array(vec![Value::Int(3)]))
    );
}

#[test]
fn m2m_payload_accepts_full_representations() {
    let registry = common::registry();
    let store = common::store();
    common::seed(&registry, &store);
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    let row = heroes
        .add(
            &mut uow,
            &record! {
                "name" => "hank",
                "powers" => vec![
                    Value::Json(serde_json::json!({"id": 1, "name": "flight"})),
                    Value::Json(serde_json::json!({"id": 3, "name": "speed"})),
                ],
            },
        )
        .expect("add");
    let id = row.get("id").cloned().expect("id");

    let result = heroes
        .query(
            &mut uow,
            &QueryParams::default()
                .param(QueryParam::new("id", "=", id))
                .relation_ids(),
        )
        .expect("query hank");
    assert_eq!(
        result.items[0].get("powers"),
        Some(&Value::Array(vec![Value::Int(1), Value::Int(3)]))
    );
}

#[test]
fn second_add_with_a_taken_unique_value_is_a_duplicate_error() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    heroes
        .add(&mut uow, &record! { "name" => "unique-one" })
        .expect("first add");
    let err = heroes
        .add(&mut uow, &record! { "name" => "unique-one" })
        .expect_err("second add must fail");
    assert!(matches!(err, Error::Duplicate(_)), "got {err:?}");
}

#[test]
fn delete_of_a_missing_identifier_succeeds_with_zero_effect() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    let removed = heroes
        .delete(&mut uow, &record! { "id" => 999 })
        .expect("delete");
    assert_eq!(removed, 0);
}

#[test]
fn get_of_a_missing_identifier_is_none() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    let row = heroes.get(&mut uow, &record! { "id" => 42 }).expect("get");
    assert!(row.is_none());
}

#[test]
fn delete_then_get_round_trip() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    let row = heroes
        .add(&mut uow, &record! { "name" => "gone-soon" })
        .expect("add");
    let id = row.get("id").cloned().expect("id");

    assert_eq!(
        heroes
            .delete(&mut uow, &record! { "id" => id.clone() })
            .expect("delete"),
        1
    );
    assert!(heroes
        .get(&mut uow, &record! { "id" => id })
        .expect("get")
        .is_none());
}

#[test]
fn update_without_identifier_is_a_validation_error() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);

    let mut uow = store.uow();
    let err = heroes
        .update(&mut uow, &record! { "name" => "nobody" })
        .expect_err("must fail");
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn o2o_payload_creates_then_merges_the_related_row() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);
    let profiles = CrudEngine::for_entity(Arc::clone(&registry), "profile").expect("engine");

    let mut uow = store.uow();
    let row = heroes
        .add(
            &mut uow,
            &record! {
                "name" => "jean",
                "profile" => Value::Json(serde_json::json!({"bio": "telepath"})),
            },
        )
        .expect("add");
    let hero_id = row.get("id").cloned().expect("id");

    // The related row exists and carries the wiring foreign key.
    let profile = profiles
        .get(&mut uow, &record! { "id" => 1 })
        .expect("get profile")
        .expect("profile row");
    assert_eq!(profile.get("hero_id"), Some(&hero_id));
    assert_eq!(profile.get("bio"), Some(&Value::Text("telepath".to_string())));

    // A second nested payload merges field-by-field instead of recreating.
    heroes
        .update(
            &mut uow,
            &record! {
                "id" => hero_id.clone(),
                "profile" => Value::Json(serde_json::json!({"years": 12})),
            },
        )
        .expect("update");
    let profile = profiles
        .get(&mut uow, &record! { "id" => 1 })
        .expect("get profile")
        .expect("profile row");
    assert_eq!(profile.get("bio"), Some(&Value::Text("telepath".to_string())));
    assert_eq!(profile.get("years"), Some(&Value::Int(12)));
    assert_eq!(store.row_count("profiles"), 1);
}

#[test]
fn dotted_path_sets_one_nested_attribute() {
    let registry = common::registry();
    let store = common::store();
    let heroes = hero_engine(&registry);
    let profiles = CrudEngine::for_entity(Arc::clone(&registry), "profile").expect("engine");

    let mut uow = store.uow();
    let row = heroes
        .add(&mut uow, &record! { "name" => "scott" })
        .expect("add");
    let hero_id = row.get("id").cloned().expect("id");

    // No profile yet: a non-null dotted value creates one.
    heroes
        .update(
            &mut uow,
            &record! { "id" => hero_id.clone(), "profile.bio" => "leader" },
        )
        .expect("update creates profile");
    let profile = profiles
        .get(&mut uow, &record! { "id" => 1 })
        .expect("get")
        .expect("profile row");
    assert_eq!(profile.get("bio"), Some(&Value::Text("leader".to_string())));

    // Existing profile: the dotted value updates the attribute in place.
    heroes
        .update(
            &mut uow,
            &record! { "id" => hero_id, "profile.bio" => "field leader" },
        )
        .expect("update sets attribute");
    let profile = profiles
        .get(&mut uow, &record! { "id" => 1 })
        .expect("get")
        .expect("profile row");
    assert_eq!(
        profile.get("bio"),
        Some(&Value::Text("field leader".to_string()))
    );
    assert_eq!(store.row_count("profiles"), 1);
}
