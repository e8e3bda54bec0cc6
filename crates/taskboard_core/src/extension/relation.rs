//! Resolution of declared relations and foreign keys.
//!
//! Relations are descriptive metadata in `EntityConfig`; the store never
//! enforces them. Extensions call these helpers to turn them into models.

use crate::store::{Model, Store};
use serde_json::Value;

/// Models of the relation's pivot entity that point at `model`.
///
/// Empty when the relation is not declared on `model`'s entity type.
pub fn related_models(store: &Store, model: &Model, relation: &str) -> Vec<Model> {
    let Some(declared) = model.collection().config().relations.get(relation) else {
        return Vec::new();
    };
    let Some(pivot) = store.collection(&declared.pivot) else {
        return Vec::new();
    };
    let Some(key) = model.get(declared.from_key()) else {
        return Vec::new();
    };
    if key.is_null() {
        return Vec::new();
    }
    let to = declared.to.as_str();
    pivot.filter(|raw| raw.get(to) == Some(&key))
}

/// Parent model referenced by the foreign-key attribute `fk_attr`.
///
/// `None` when `fk_attr` is not declared in `pk`, is unset, or names a
/// record that no longer exists.
pub fn parent_model(store: &Store, model: &Model, fk_attr: &str) -> Option<Model> {
    let parent_entity = model.collection().config().pk.get(fk_attr)?;
    let parent_id = match model.get(fk_attr)? {
        Value::String(id) if !id.is_empty() => id,
        _ => return None,
    };
    store.collection(parent_entity)?.get_model(&parent_id)
}
