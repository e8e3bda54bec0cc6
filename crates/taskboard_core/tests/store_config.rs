use serde_json::json;
use taskboard_core::{
    core_store_config, current_store, provide, record, ConfigError, CoreStore, ExtensionError,
    ExtensionRegistry, Store, StoreConfig, StoreError,
};

const BOARD_CONFIG: &str = r#"{
    "models": {
        "sprint": {
            "attributes": { "title": "", "closed": false },
            "relations": { "stories": { "pivot": "story", "to": "sprintId" } }
        },
        "story": {
            "attributes": { "points": 0 },
            "pk": { "sprintId": "sprint" }
        }
    }
}"#;

#[test]
fn store_builds_from_json_document_in_declared_order() {
    let config = StoreConfig::from_json_str(BOARD_CONFIG).expect("config should parse");
    let store = Store::new("Board", config, ExtensionRegistry::new()).expect("store should build");

    assert_eq!(store.entity_names(), vec!["sprint", "story"]);
    let sprints = store.collection("sprint").unwrap();
    assert_eq!(sprints.defaults().get("closed"), Some(&json!(false)));

    // Declared defaults are not applied on create.
    let sprint = sprints.create(record([("title", json!("S1"))]));
    assert!(sprint.get("closed").is_none());
}

#[test]
fn bare_models_map_is_accepted() {
    let config = StoreConfig::from_json_str(r#"{ "b": {}, "a": {} }"#).unwrap();
    assert_eq!(config.entity_names(), vec!["b", "a"]);
}

#[test]
fn malformed_document_is_a_parse_error() {
    let err = StoreConfig::from_json_str(r#"{ "models": { "a": { "attributes": 3 } } }"#)
        .expect_err("attributes must be a map");
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn store_rejects_relation_to_unknown_entity() {
    let config = StoreConfig::from_json_str(
        r#"{ "models": { "sprint": { "relations": { "stories": { "pivot": "story", "to": "sprintId" } } } } }"#,
    )
    .unwrap();
    let err = Store::new("Board", config, ExtensionRegistry::new()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidConfig(ConfigError::UnknownRelationPivot { ref pivot, .. }) if pivot == "story"
    ));
}

#[test]
fn store_rejects_duplicate_entities_in_document() {
    let config = StoreConfig::from_json_str(r#"{ "models": { "a": {}, "a": {} } }"#).unwrap();
    let err = Store::new("Dup", config, ExtensionRegistry::new()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidConfig(ConfigError::DuplicateEntity(name)) if name == "a"
    ));
}

#[test]
fn store_rejects_extension_for_unconfigured_entity() {
    let mut extensions = ExtensionRegistry::new();
    extensions
        .register_model("comment", |_| ())
        .expect("registration itself succeeds");

    let err = Store::new("Core", core_store_config(), extensions).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Extension(ExtensionError::UnknownEntity { ref entity, .. }) if entity == "comment"
    ));
}

#[test]
fn services_are_built_once_collections_exist() {
    struct Counts {
        projects: usize,
    }

    let store = Store::builder("Core")
        .config(core_store_config())
        .services(|store| Counts {
            projects: store.collection("project").map_or(0, |c| c.len()),
        })
        .build()
        .unwrap();

    assert!(store.is_booted());
    assert_eq!(store.services::<Counts>().map(|c| c.projects), Some(0));
}

#[test]
fn context_provides_the_store_to_nested_code() {
    fn count_projects() -> Result<usize, StoreError> {
        Ok(CoreStore::current()?.projects().len())
    }

    assert!(matches!(count_projects(), Err(StoreError::MissingContext)));

    let core = CoreStore::new().unwrap();
    core.projects().create(record([("name", json!("Ctx"))]));
    {
        let _guard = provide(core.store().clone());
        assert_eq!(count_projects().unwrap(), 1);
        assert!(current_store().unwrap().ptr_eq(core.store()));
    }
    assert!(current_store().is_err());
}
