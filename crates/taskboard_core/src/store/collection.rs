//! Keyed record table for one entity type.
//!
//! # Responsibility
//! - Own the `id -> Record` table of one entity type.
//! - Hand out `Model` handles and host the collection extension.
//! - Notify subscribers of every applied write.
//!
//! # Invariants
//! - A stored record's `id` attribute always equals its table key.
//! - Every write bumps `version`; the written record remembers it as its revision.
//! - `get_model` returns the same handle instance while the record's revision
//!   is unchanged and some caller still holds that handle.
//! - Update/remove of an unknown id is a silent no-op.

use crate::extension::registry::{
    CollectionExtensionContext, CollectionExtensionFactory, ModelExtensionFactory,
};
use crate::store::config::EntityConfig;
use crate::store::model::{Model, ModelInner};
use crate::store::record::{
    new_record_id, record_id, Record, Timestamps, CREATED_AT, ID, UPDATED_AT,
};
use crate::store::subscription::{CollectionEvent, Subscribers, SubscriptionId};
use crate::store::{Store, StoreInner, WeakStore};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

/// Dead identity-cache entries are swept once the cache grows past this.
const MODEL_CACHE_SWEEP_THRESHOLD: usize = 256;

pub(crate) struct StoredRecord {
    pub(crate) attrs: Record,
    revision: u64,
}

struct CachedModel {
    revision: u64,
    handle: Weak<ModelInner>,
}

pub(crate) struct CollectionInner {
    name: String,
    config: EntityConfig,
    store: Weak<StoreInner>,
    timestamps: Rc<Timestamps>,
    records: RefCell<BTreeMap<String, StoredRecord>>,
    version: Cell<u64>,
    models: RefCell<HashMap<String, CachedModel>>,
    model_extension: Option<ModelExtensionFactory>,
    ext: Option<Box<dyn Any>>,
    subscribers: Subscribers,
}

/// Everything a store passes down when it builds one collection.
pub(crate) struct CollectionParts {
    pub(crate) name: String,
    pub(crate) config: EntityConfig,
    pub(crate) store: Weak<StoreInner>,
    pub(crate) timestamps: Rc<Timestamps>,
    pub(crate) model_extension: Option<ModelExtensionFactory>,
    pub(crate) collection_extension: Option<CollectionExtensionFactory>,
}

/// Shared handle to one entity type's record table.
#[derive(Clone)]
pub struct Collection(Rc<CollectionInner>);

/// Non-owning collection handle, used by extensions.
#[derive(Clone, Default)]
pub struct WeakCollection(Weak<CollectionInner>);

impl WeakCollection {
    pub fn upgrade(&self) -> Option<Collection> {
        self.0.upgrade().map(Collection)
    }
}

impl Collection {
    pub(crate) fn new(parts: CollectionParts) -> Self {
        Self(Rc::new_cyclic(|weak| {
            let ext = parts.collection_extension.map(|factory| {
                factory(CollectionExtensionContext {
                    store: WeakStore(parts.store.clone()),
                    collection: WeakCollection(weak.clone()),
                })
            });
            CollectionInner {
                name: parts.name,
                config: parts.config,
                store: parts.store,
                timestamps: parts.timestamps,
                records: RefCell::new(BTreeMap::new()),
                version: Cell::new(0),
                models: RefCell::new(HashMap::new()),
                model_extension: parts.model_extension,
                ext,
                subscribers: Subscribers::default(),
            }
        }))
    }

    /// Entity type name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn config(&self) -> &EntityConfig {
        &self.0.config
    }

    /// Declared default attributes. Informational; `create` does not apply them.
    pub fn defaults(&self) -> &Record {
        &self.0.config.attributes
    }

    /// Owning store, if it is still alive.
    pub fn store(&self) -> Option<Store> {
        self.0.store.upgrade().map(Store)
    }

    pub(crate) fn weak_store(&self) -> WeakStore {
        WeakStore(self.0.store.clone())
    }

    /// Collection extension, when one was registered with type `T`.
    pub fn ext<T: Any>(&self) -> Option<&T> {
        self.0.ext.as_ref()?.downcast_ref::<T>()
    }

    pub fn downgrade(&self) -> WeakCollection {
        WeakCollection(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Write counter; strictly increases with every applied write.
    pub fn version(&self) -> u64 {
        self.0.version.get()
    }

    pub fn len(&self) -> usize {
        self.0.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.records.borrow().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.records.borrow().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.0.records.borrow().keys().cloned().collect()
    }

    /// Models for every record, in table order.
    pub fn all(&self) -> Vec<Model> {
        self.filter(|_| true)
    }

    /// Copies of every raw record, in table order.
    pub fn values(&self) -> Vec<Record> {
        self.0
            .records
            .borrow()
            .values()
            .map(|stored| stored.attrs.clone())
            .collect()
    }

    /// Deep plain-value snapshot: `id -> record`.
    pub fn json(&self) -> Map<String, Value> {
        self.0
            .records
            .borrow()
            .iter()
            .map(|(id, stored)| (id.clone(), Value::Object(stored.attrs.clone())))
            .collect()
    }

    pub fn get_model(&self, id: &str) -> Option<Model> {
        let revision = self.0.records.borrow().get(id)?.revision;
        Some(self.model_at(id, revision))
    }

    /// Models for `ids` in input order; unknown ids are skipped.
    pub fn get_models<I, S>(&self, ids: I) -> Vec<Model>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .filter_map(|id| self.get_model(id.as_ref()))
            .collect()
    }

    /// First record (table order) matching `predicate`.
    ///
    /// The predicate must not write to this collection.
    pub fn find(&self, predicate: impl Fn(&Record) -> bool) -> Option<Model> {
        let hit = self
            .0
            .records
            .borrow()
            .iter()
            .find(|(_, stored)| predicate(&stored.attrs))
            .map(|(id, stored)| (id.clone(), stored.revision));
        hit.map(|(id, revision)| self.model_at(&id, revision))
    }

    /// All records (table order) matching `predicate`.
    ///
    /// The predicate must not write to this collection.
    pub fn filter(&self, predicate: impl Fn(&Record) -> bool) -> Vec<Model> {
        let hits: Vec<(String, u64)> = self
            .0
            .records
            .borrow()
            .iter()
            .filter(|(_, stored)| predicate(&stored.attrs))
            .map(|(id, stored)| (id.clone(), stored.revision))
            .collect();
        hits.into_iter()
            .map(|(id, revision)| self.model_at(&id, revision))
            .collect()
    }

    /// Creates a record from caller attributes and returns its model.
    ///
    /// `id`, `createdAt` and `updatedAt` are generated first and may be
    /// overridden by `attributes`; a non-string or empty `id` is replaced.
    pub fn create(&self, attributes: Record) -> Model {
        let now = self.0.timestamps.next();
        let mut record = Record::new();
        record.insert(ID.to_string(), Value::String(new_record_id()));
        record.insert(CREATED_AT.to_string(), Value::String(now.clone()));
        record.insert(UPDATED_AT.to_string(), Value::String(now));
        record.extend(attributes);

        let id = match record_id(&record) {
            Some(id) => id.to_string(),
            None => {
                let id = new_record_id();
                record.insert(ID.to_string(), Value::String(id.clone()));
                id
            }
        };
        self.insert(id, record)
    }

    /// Inserts a complete record as-is, replacing any record with the same id.
    ///
    /// Returns `None` when the record has no usable string `id`.
    pub fn add(&self, record: Record) -> Option<Model> {
        let Some(id) = record_id(&record).map(str::to_string) else {
            warn!(
                "event=record_add module=store status=skipped entity={} reason=missing_id",
                self.0.name
            );
            return None;
        };
        Some(self.insert(id, record))
    }

    /// Seeds the table with existing records; returns how many were stored.
    pub fn hydrate<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = Record>,
    {
        let stored = records
            .into_iter()
            .filter_map(|record| self.add(record))
            .count();
        debug!(
            "event=collection_hydrate module=store status=ok entity={} count={}",
            self.0.name, stored
        );
        stored
    }

    /// Shallow-merges `patch` into the record named by `patch.id` and
    /// refreshes `updatedAt`. Unknown or missing ids are ignored.
    pub fn update(&self, patch: Record) {
        let Some(id) = record_id(&patch).map(str::to_string) else {
            debug!(
                "event=record_update module=store status=skipped entity={} reason=missing_id",
                self.0.name
            );
            return;
        };

        let changed = {
            let mut records = self.0.records.borrow_mut();
            let Some(stored) = records.get_mut(&id) else {
                debug!(
                    "event=record_update module=store status=skipped entity={} id={} reason=not_found",
                    self.0.name, id
                );
                return;
            };

            let mut changed = Vec::new();
            for (key, value) in patch {
                if key == UPDATED_AT {
                    continue;
                }
                if stored.attrs.get(&key) != Some(&value) {
                    changed.push(key.clone());
                }
                stored.attrs.insert(key, value);
            }
            stored.attrs.insert(
                UPDATED_AT.to_string(),
                Value::String(self.0.timestamps.next()),
            );
            changed.push(UPDATED_AT.to_string());
            stored.revision = self.bump_version();
            changed
        };

        debug!(
            "event=record_update module=store status=ok entity={} id={} changed={}",
            self.0.name,
            id,
            changed.len()
        );
        self.0
            .subscribers
            .emit(&CollectionEvent::Updated { id, changed });
    }

    /// Deletes a record. Related records in other collections are left as-is.
    pub fn remove(&self, id: &str) {
        let removed = self.0.records.borrow_mut().remove(id).is_some();
        if !removed {
            debug!(
                "event=record_remove module=store status=skipped entity={} id={} reason=not_found",
                self.0.name, id
            );
            return;
        }
        self.0.models.borrow_mut().remove(id);
        self.bump_version();
        debug!(
            "event=record_remove module=store status=ok entity={} id={}",
            self.0.name, id
        );
        self.0.subscribers.emit(&CollectionEvent::Removed {
            id: id.to_string(),
        });
    }

    /// Registers a listener called after every applied write.
    pub fn subscribe(&self, listener: impl Fn(&CollectionEvent) + 'static) -> SubscriptionId {
        self.0.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.len()
    }

    pub(crate) fn records(&self) -> &RefCell<BTreeMap<String, StoredRecord>> {
        &self.0.records
    }

    fn insert(&self, id: String, attrs: Record) -> Model {
        let revision = self.bump_version();
        let previous = self
            .0
            .records
            .borrow_mut()
            .insert(id.clone(), StoredRecord { attrs, revision });

        let event = match previous {
            None => CollectionEvent::Added { id: id.clone() },
            Some(previous) => {
                let records = self.0.records.borrow();
                let current = records.get(&id).map(|stored| &stored.attrs);
                CollectionEvent::Updated {
                    id: id.clone(),
                    changed: current
                        .map(|current| changed_keys(&previous.attrs, current))
                        .unwrap_or_default(),
                }
            }
        };
        debug!(
            "event=record_insert module=store status=ok entity={} id={} replaced={}",
            self.0.name,
            id,
            matches!(event, CollectionEvent::Updated { .. })
        );

        let model = self.model_at(&id, revision);
        self.0.subscribers.emit(&event);
        model
    }

    fn model_at(&self, id: &str, revision: u64) -> Model {
        if let Some(cached) = self.0.models.borrow().get(id) {
            if cached.revision == revision {
                if let Some(inner) = cached.handle.upgrade() {
                    return Model::from_inner(inner);
                }
            }
        }

        // Built with no cache borrow held: the extension factory may look
        // up other models of this collection.
        let model = Model::new(self, id.to_string(), self.0.model_extension.as_ref());
        let mut cache = self.0.models.borrow_mut();
        cache.insert(
            id.to_string(),
            CachedModel {
                revision,
                handle: model.downgrade_inner(),
            },
        );
        if cache.len() > MODEL_CACHE_SWEEP_THRESHOLD {
            cache.retain(|_, cached| cached.handle.strong_count() > 0);
        }
        model
    }

    fn bump_version(&self) -> u64 {
        let next = self.0.version.get() + 1;
        self.0.version.set(next);
        next
    }
}

impl Debug for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.0.name)
            .field("len", &self.len())
            .field("version", &self.version())
            .finish()
    }
}

fn changed_keys(before: &Record, after: &Record) -> Vec<String> {
    let mut keys: Vec<String> = after
        .iter()
        .filter(|(key, value)| before.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    keys.extend(
        before
            .keys()
            .filter(|key| !after.contains_key(key.as_str()))
            .cloned(),
    );
    keys
}
