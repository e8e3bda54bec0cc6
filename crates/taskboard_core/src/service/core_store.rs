//! Task-board store: projects and tasks wired with their extensions.
//!
//! # Responsibility
//! - Own the fixed project/task configuration.
//! - Hand typed access to both collections to callers and view-state.
//!
//! # Invariants
//! - A `CoreStore` always has both the `project` and `task` collections;
//!   `from_store` rejects stores without them.

use crate::extension::registry::{ExtensionError, ExtensionRegistry};
use crate::model::project::{
    ProjectCollectionExtension, ProjectExtension, PROJECT_ENTITY, PROJECT_TASKS_RELATION,
};
use crate::model::task::{TaskExtension, TASK_ENTITY, TASK_PROJECT_KEY};
use crate::store::config::{EntityConfig, RelationConfig, StoreConfig};
use crate::store::context::current_store;
use crate::store::record::Clock;
use crate::store::{Collection, Store, StoreResult};
use serde_json::json;

/// Store name used for the task board.
pub const CORE_STORE_NAME: &str = "CoreStore";

/// Entity configuration for projects and tasks.
pub fn core_store_config() -> StoreConfig {
    StoreConfig::new()
        .entity(
            PROJECT_ENTITY,
            EntityConfig::new()
                .attribute("name", json!(""))
                .attribute("description", json!(""))
                .attribute("status", json!("active"))
                .relation(
                    PROJECT_TASKS_RELATION,
                    RelationConfig::new(TASK_ENTITY, TASK_PROJECT_KEY),
                ),
        )
        .entity(
            TASK_ENTITY,
            EntityConfig::new()
                .attribute("title", json!(""))
                .attribute("description", json!(""))
                .attribute("status", json!("todo"))
                .attribute("priority", json!("medium"))
                .attribute(TASK_PROJECT_KEY, json!(""))
                .pk(TASK_PROJECT_KEY, PROJECT_ENTITY),
        )
}

/// Extensions attached to the project and task entities.
pub fn core_extensions() -> Result<ExtensionRegistry, ExtensionError> {
    let mut registry = ExtensionRegistry::new();
    registry.register_model(PROJECT_ENTITY, ProjectExtension::new)?;
    registry.register_collection(PROJECT_ENTITY, ProjectCollectionExtension::new)?;
    registry.register_model(TASK_ENTITY, TaskExtension::new)?;
    Ok(registry)
}

/// Typed facade over the task-board store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CoreStore {
    store: Store,
    projects: Collection,
    tasks: Collection,
}

impl CoreStore {
    /// Builds a fresh, empty task-board store.
    pub fn new() -> StoreResult<Self> {
        Self::from_store(Store::new(
            CORE_STORE_NAME,
            core_store_config(),
            core_extensions()?,
        )?)
    }

    /// Like `new`, with a custom clock for `createdAt`/`updatedAt`.
    pub fn with_clock(clock: impl Clock + 'static) -> StoreResult<Self> {
        let store = Store::builder(CORE_STORE_NAME)
            .config(core_store_config())
            .extensions(core_extensions()?)
            .clock(clock)
            .build()?;
        Self::from_store(store)
    }

    /// Wraps an existing store that has both task-board collections.
    ///
    /// # Errors
    /// - `UnknownEntity` when `project` or `task` is not configured.
    pub fn from_store(store: Store) -> StoreResult<Self> {
        let projects = store.try_collection(PROJECT_ENTITY)?.clone();
        let tasks = store.try_collection(TASK_ENTITY)?.clone();
        Ok(Self {
            store,
            projects,
            tasks,
        })
    }

    /// The task-board store provided to the current thread.
    ///
    /// # Errors
    /// - `MissingContext` when no provider is alive.
    pub fn current() -> StoreResult<Self> {
        Self::from_store(current_store()?)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn projects(&self) -> &Collection {
        &self.projects
    }

    pub fn tasks(&self) -> &Collection {
        &self.tasks
    }

    /// Collection-level project queries.
    pub fn project_queries(&self) -> Option<&ProjectCollectionExtension> {
        self.projects().ext::<ProjectCollectionExtension>()
    }
}

impl From<CoreStore> for Store {
    fn from(value: CoreStore) -> Self {
        value.store
    }
}

#[cfg(test)]
mod tests {
    use super::{core_extensions, core_store_config, CoreStore};
    use crate::extension::registry::ExtensionRegistry;
    use crate::store::config::{EntityConfig, StoreConfig};
    use crate::store::context::provide;
    use crate::store::{Store, StoreError};

    #[test]
    fn config_declares_projects_before_tasks() {
        let config = core_store_config();
        config.validate().expect("core config should be valid");
        assert_eq!(config.entity_names(), vec!["project", "task"]);
        assert_eq!(
            config.get("task").expect("task entity").pk.get("projectId"),
            Some(&"project".to_string())
        );
        assert_eq!(core_extensions().expect("registry").len(), 3);
    }

    #[test]
    fn from_store_rejects_foreign_store() {
        let store = Store::new(
            "Other",
            StoreConfig::new().entity("project", EntityConfig::new()),
            ExtensionRegistry::new(),
        )
        .unwrap();
        let err = CoreStore::from_store(store).expect_err("task collection is missing");
        assert!(matches!(err, StoreError::UnknownEntity(name) if name == "task"));
    }

    #[test]
    fn current_reads_provided_store() {
        assert!(matches!(CoreStore::current(), Err(StoreError::MissingContext)));

        let core = CoreStore::new().unwrap();
        let _guard = provide(core.store().clone());
        let current = CoreStore::current().expect("store is provided");
        assert!(current.store().ptr_eq(core.store()));
        assert!(current.project_queries().is_some());
    }
}
