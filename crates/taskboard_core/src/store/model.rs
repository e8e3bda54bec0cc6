//! Read/write handle over one record.
//!
//! A `Model` owns no data: every read looks the record up in its collection,
//! so a handle always reflects the latest write, including writes made
//! through other handles.

use crate::extension::registry::{ModelExtensionContext, ModelExtensionFactory};
use crate::store::collection::Collection;
use crate::store::error::StoreResult;
use crate::store::record::{Record, ID};
use crate::store::Store;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::cell::Ref;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

pub(crate) struct ModelInner {
    id: String,
    collection: Collection,
    ext: Option<Box<dyn Any>>,
}

/// Handle identified by `(collection, id)`.
///
/// Equality compares that pair; use `same_instance` for handle identity.
#[derive(Clone)]
pub struct Model(Rc<ModelInner>);

/// Non-owning model handle, used by extensions.
#[derive(Clone, Default)]
pub struct WeakModel(Weak<ModelInner>);

impl WeakModel {
    pub fn upgrade(&self) -> Option<Model> {
        self.0.upgrade().map(Model)
    }
}

impl Model {
    pub(crate) fn new(
        collection: &Collection,
        id: String,
        extension: Option<&ModelExtensionFactory>,
    ) -> Self {
        Self(Rc::new_cyclic(|weak| {
            let ext = extension.map(|factory| {
                factory(ModelExtensionContext {
                    store: collection.weak_store(),
                    model: WeakModel(weak.clone()),
                })
            });
            ModelInner {
                id,
                collection: collection.clone(),
                ext,
            }
        }))
    }

    pub(crate) fn from_inner(inner: Rc<ModelInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade_inner(&self) -> Weak<ModelInner> {
        Rc::downgrade(&self.0)
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Entity type name.
    pub fn name(&self) -> &str {
        self.0.collection.name()
    }

    pub fn collection(&self) -> &Collection {
        &self.0.collection
    }

    pub fn store(&self) -> Option<Store> {
        self.0.collection.store()
    }

    /// Live view of the record's current attributes.
    ///
    /// `None` once the record has been removed. The returned borrow must be
    /// released before writing to the same collection.
    pub fn attr(&self) -> Option<Ref<'_, Record>> {
        Ref::filter_map(self.0.collection.records().borrow(), |records| {
            records.get(self.0.id.as_str()).map(|stored| &stored.attrs)
        })
        .ok()
    }

    /// Current value of one attribute.
    pub fn get(&self, attr: &str) -> Option<Value> {
        self.attr()?.get(attr).cloned()
    }

    /// Current value of one string attribute.
    pub fn get_str(&self, attr: &str) -> Option<String> {
        match self.get(attr)? {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Deep copy of the current attributes.
    pub fn json(&self) -> Option<Record> {
        self.attr().map(|attrs| Record::clone(&attrs))
    }

    /// Typed copy of the current attributes.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<Option<T>> {
        let Some(attrs) = self.json() else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(Value::Object(attrs))?))
    }

    pub fn exists(&self) -> bool {
        self.0.collection.contains(&self.0.id)
    }

    /// Writes `values` through the collection; `id` is always this model's id.
    pub fn save(&self, values: Record) {
        let mut patch = values;
        patch.insert(ID.to_string(), Value::String(self.0.id.clone()));
        self.0.collection.update(patch);
    }

    /// Model extension, when one was registered with type `T`.
    pub fn ext<T: Any>(&self) -> Option<&T> {
        self.0.ext.as_ref()?.downcast_ref::<T>()
    }

    pub fn same_instance(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakModel {
        WeakModel(Rc::downgrade(&self.0))
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.0.collection.ptr_eq(&other.0.collection) && self.0.id == other.0.id
    }
}

impl Eq for Model {}

impl Debug for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name())
            .field("id", &self.0.id)
            .finish()
    }
}
