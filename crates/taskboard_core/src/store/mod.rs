//! Reactive entity store: Store -> Collection -> Model.
//!
//! # Responsibility
//! - Build one collection per configured entity type and wire extensions.
//! - Be the single root for cross-collection navigation.
//!
//! # Invariants
//! - The entity set is fixed at construction; no types are added afterwards.
//! - Construction never upgrades back-references, so no collection depends on
//!   another one existing first.
//! - `is_booted()` turns true only after collections and services exist.
//! - Single-threaded: handles are `Rc`-based and `!Send`.

use crate::extension::registry::ExtensionRegistry;
use crate::store::collection::CollectionParts;
use crate::store::config::StoreConfig;
use crate::store::record::{Clock, Timestamps};
use log::info;
use once_cell::unsync::OnceCell;
use std::any::Any;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod record;
pub mod subscription;

pub use collection::{Collection, WeakCollection};
pub use error::{StoreError, StoreResult};
pub use model::{Model, WeakModel};

type ServicesFactory = Box<dyn FnOnce(&Store) -> Box<dyn Any>>;

pub(crate) struct StoreInner {
    name: String,
    config: StoreConfig,
    collections: Vec<Collection>,
    index: BTreeMap<String, usize>,
    booted: Cell<bool>,
    services: OnceCell<Box<dyn Any>>,
}

/// Root of the entity graph. Cheap to clone.
#[derive(Clone)]
pub struct Store(Rc<StoreInner>);

/// Non-owning store handle, used by extensions.
#[derive(Clone, Default)]
pub struct WeakStore(Weak<StoreInner>);

impl WeakStore {
    pub fn upgrade(&self) -> Option<Store> {
        self.0.upgrade().map(Store)
    }
}

/// Collects everything a store needs before it is built.
pub struct StoreBuilder {
    name: String,
    config: StoreConfig,
    extensions: ExtensionRegistry,
    timestamps: Timestamps,
    services: Option<ServicesFactory>,
}

impl StoreBuilder {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = extensions;
        self
    }

    /// Replaces the wall clock used for `createdAt`/`updatedAt`.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.timestamps = Timestamps::new(clock);
        self
    }

    /// Services are built after every collection exists and may use the store.
    pub fn services<S, F>(mut self, factory: F) -> Self
    where
        S: Any,
        F: FnOnce(&Store) -> S + 'static,
    {
        self.services = Some(Box::new(move |store| Box::new(factory(store)) as Box<dyn Any>));
        self
    }

    /// Validates the configuration and builds the store.
    ///
    /// # Errors
    /// - `InvalidConfig` when the configuration violates declaration rules.
    /// - `Extension` when an extension targets an unconfigured entity.
    pub fn build(self) -> StoreResult<Store> {
        self.config.validate()?;
        self.extensions.validate_against(&self.config)?;

        let StoreBuilder {
            name,
            config,
            extensions,
            timestamps,
            services,
        } = self;
        let timestamps = Rc::new(timestamps);

        let inner = Rc::new_cyclic(|weak: &Weak<StoreInner>| {
            let mut collections = Vec::with_capacity(config.models.len());
            let mut index = BTreeMap::new();
            for (entity, entity_config) in config.models.iter() {
                index.insert(entity.to_string(), collections.len());
                collections.push(Collection::new(CollectionParts {
                    name: entity.to_string(),
                    config: entity_config.clone(),
                    store: weak.clone(),
                    timestamps: Rc::clone(&timestamps),
                    model_extension: extensions.model_factory(entity),
                    collection_extension: extensions.collection_factory(entity),
                }));
            }
            StoreInner {
                name,
                config,
                collections,
                index,
                booted: Cell::new(false),
                services: OnceCell::new(),
            }
        });

        let store = Store(inner);
        if let Some(factory) = services {
            let built = factory(&store);
            let _ = store.0.services.set(built);
        }
        store.0.booted.set(true);

        info!(
            "event=store_boot module=store status=ok name={} entities={}",
            store.name(),
            store.entity_names().join(",")
        );
        Ok(store)
    }
}

impl Store {
    pub fn builder(name: impl Into<String>) -> StoreBuilder {
        StoreBuilder {
            name: name.into(),
            config: StoreConfig::default(),
            extensions: ExtensionRegistry::default(),
            timestamps: Timestamps::default(),
            services: None,
        }
    }

    /// Builds a store with the system clock and no services.
    pub fn new(
        name: impl Into<String>,
        config: StoreConfig,
        extensions: ExtensionRegistry,
    ) -> StoreResult<Self> {
        Self::builder(name)
            .config(config)
            .extensions(extensions)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn config(&self) -> &StoreConfig {
        &self.0.config
    }

    pub fn is_booted(&self) -> bool {
        self.0.booted.get()
    }

    /// Collection for one entity type (`store.model.<entity>`).
    pub fn collection(&self, entity: &str) -> Option<&Collection> {
        let position = *self.0.index.get(entity)?;
        self.0.collections.get(position)
    }

    /// Like `collection`, but an unknown entity type is an error.
    pub fn try_collection(&self, entity: &str) -> StoreResult<&Collection> {
        self.collection(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))
    }

    /// Collections in configuration order.
    pub fn collections(&self) -> &[Collection] {
        &self.0.collections
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.0
            .collections
            .iter()
            .map(|collection| collection.name())
            .collect()
    }

    /// Sum of every collection's version; changes whenever any record changes.
    pub fn revision(&self) -> u64 {
        self.0
            .collections
            .iter()
            .map(|collection| collection.version())
            .sum()
    }

    /// Services built at construction, when they have type `S`.
    pub fn services<S: Any>(&self) -> Option<&S> {
        self.0.services.get()?.downcast_ref::<S>()
    }

    pub fn downgrade(&self) -> WeakStore {
        WeakStore(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.0.name)
            .field("booted", &self.is_booted())
            .field("collections", &self.0.collections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::extension::registry::ExtensionRegistry;
    use crate::store::config::{EntityConfig, StoreConfig};
    use crate::store::error::StoreError;

    fn config() -> StoreConfig {
        StoreConfig::new()
            .entity("note", EntityConfig::new())
            .entity("author", EntityConfig::new())
    }

    #[test]
    fn builds_collections_in_config_order() {
        let store = Store::new("Test", config(), ExtensionRegistry::new()).unwrap();
        assert!(store.is_booted());
        assert_eq!(store.entity_names(), vec!["note", "author"]);
        assert!(store.collection("note").is_some());
        assert!(store.collection("missing").is_none());
        assert!(matches!(
            store.try_collection("missing"),
            Err(StoreError::UnknownEntity(name)) if name == "missing"
        ));
    }

    #[test]
    fn services_see_a_fully_built_store() {
        struct Services {
            entity_count: usize,
        }

        let store = Store::builder("Test")
            .config(config())
            .services(|store| Services {
                entity_count: store.collections().len(),
            })
            .build()
            .unwrap();

        let services = store.services::<Services>().expect("services should exist");
        assert_eq!(services.entity_count, 2);
        assert!(store.services::<String>().is_none());
    }

    #[test]
    fn revision_tracks_writes_in_any_collection() {
        let store = Store::new("Test", config(), ExtensionRegistry::new()).unwrap();
        let before = store.revision();
        let note = store.collection("note").unwrap().create(Default::default());
        assert!(store.revision() > before);

        let after_create = store.revision();
        store.collection("author").unwrap().remove(note.id());
        assert_eq!(store.revision(), after_create);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = StoreConfig::new().entity("", EntityConfig::new());
        let err = Store::new("Test", config, ExtensionRegistry::new()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }
}
