//! Extension registry contracts.
//!
//! Entity-specific derived behavior is attached to models and collections by
//! factory functions registered per entity type. A host calls its factory once
//! at construction and owns the returned value.

use crate::store::config::StoreConfig;
use crate::store::{WeakCollection, WeakModel, WeakStore};
use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Back-references handed to a model extension factory.
///
/// Both handles are weak. They must not be upgraded inside the factory:
/// the host is still being constructed at that point.
#[derive(Clone)]
pub struct ModelExtensionContext {
    pub store: WeakStore,
    pub model: WeakModel,
}

/// Back-references handed to a collection extension factory.
#[derive(Clone)]
pub struct CollectionExtensionContext {
    pub store: WeakStore,
    pub collection: WeakCollection,
}

pub(crate) type ModelExtensionFactory = Rc<dyn Fn(ModelExtensionContext) -> Box<dyn Any>>;
pub(crate) type CollectionExtensionFactory =
    Rc<dyn Fn(CollectionExtensionContext) -> Box<dyn Any>>;

/// Host kind an extension attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionHost {
    Model,
    Collection,
}

impl ExtensionHost {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Collection => "collection",
        }
    }
}

/// Per-entity extension factories for one store.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    model: BTreeMap<String, ModelExtensionFactory>,
    collection: BTreeMap<String, CollectionExtensionFactory>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the model extension for one entity type.
    pub fn register_model<E, F>(&mut self, entity: &str, factory: F) -> Result<(), ExtensionError>
    where
        E: Any,
        F: Fn(ModelExtensionContext) -> E + 'static,
    {
        let entity = normalize_entity(entity, ExtensionHost::Model)?;
        if self.model.contains_key(entity.as_str()) {
            return Err(ExtensionError::Duplicate {
                host: ExtensionHost::Model,
                entity,
            });
        }
        self.model.insert(
            entity,
            Rc::new(move |context| Box::new(factory(context)) as Box<dyn Any>),
        );
        Ok(())
    }

    /// Registers the collection extension for one entity type.
    pub fn register_collection<E, F>(
        &mut self,
        entity: &str,
        factory: F,
    ) -> Result<(), ExtensionError>
    where
        E: Any,
        F: Fn(CollectionExtensionContext) -> E + 'static,
    {
        let entity = normalize_entity(entity, ExtensionHost::Collection)?;
        if self.collection.contains_key(entity.as_str()) {
            return Err(ExtensionError::Duplicate {
                host: ExtensionHost::Collection,
                entity,
            });
        }
        self.collection.insert(
            entity,
            Rc::new(move |context| Box::new(factory(context)) as Box<dyn Any>),
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.model.len() + self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_empty() && self.collection.is_empty()
    }

    pub fn has_model_extension(&self, entity: &str) -> bool {
        self.model.contains_key(entity)
    }

    pub fn has_collection_extension(&self, entity: &str) -> bool {
        self.collection.contains_key(entity)
    }

    /// Rejects registrations for entity types the config does not declare.
    pub fn validate_against(&self, config: &StoreConfig) -> Result<(), ExtensionError> {
        let unknown_model = self.model.keys().map(|name| (ExtensionHost::Model, name));
        let unknown_collection = self
            .collection
            .keys()
            .map(|name| (ExtensionHost::Collection, name));
        for (host, entity) in unknown_model.chain(unknown_collection) {
            if !config.contains(entity) {
                return Err(ExtensionError::UnknownEntity {
                    host,
                    entity: entity.clone(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn model_factory(&self, entity: &str) -> Option<ModelExtensionFactory> {
        self.model.get(entity).cloned()
    }

    pub(crate) fn collection_factory(&self, entity: &str) -> Option<CollectionExtensionFactory> {
        self.collection.get(entity).cloned()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("model", &self.model.keys().collect::<Vec<_>>())
            .field("collection", &self.collection.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize_entity(entity: &str, host: ExtensionHost) -> Result<String, ExtensionError> {
    let normalized = entity.trim();
    if normalized.is_empty() {
        return Err(ExtensionError::EmptyEntity(host));
    }
    Ok(normalized.to_string())
}

/// Extension registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    EmptyEntity(ExtensionHost),
    Duplicate {
        host: ExtensionHost,
        entity: String,
    },
    UnknownEntity {
        host: ExtensionHost,
        entity: String,
    },
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEntity(host) => {
                write!(f, "{} extension entity name cannot be empty", host.as_str())
            }
            Self::Duplicate { host, entity } => write!(
                f,
                "{} extension already registered for `{entity}`",
                host.as_str()
            ),
            Self::UnknownEntity { host, entity } => write!(
                f,
                "{} extension registered for unknown entity `{entity}`",
                host.as_str()
            ),
        }
    }
}

impl Error for ExtensionError {}

#[cfg(test)]
mod tests {
    use super::{ExtensionError, ExtensionHost, ExtensionRegistry};
    use crate::store::config::{EntityConfig, StoreConfig};

    struct Marker;

    #[test]
    fn rejects_duplicate_registration_per_host() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register_model("project", |_| Marker)
            .expect("first registration should succeed");
        registry
            .register_collection("project", |_| Marker)
            .expect("collection host is independent");

        let err = registry
            .register_model(" project ", |_| Marker)
            .expect_err("duplicate registration must fail");
        assert_eq!(
            err,
            ExtensionError::Duplicate {
                host: ExtensionHost::Model,
                entity: "project".to_string(),
            }
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rejects_blank_entity() {
        let mut registry = ExtensionRegistry::new();
        let err = registry
            .register_collection("  ", |_| Marker)
            .expect_err("blank entity must fail");
        assert_eq!(err, ExtensionError::EmptyEntity(ExtensionHost::Collection));
    }

    #[test]
    fn validate_against_rejects_unconfigured_entity() {
        let mut registry = ExtensionRegistry::new();
        registry.register_model("project", |_| Marker).unwrap();
        registry.register_collection("comment", |_| Marker).unwrap();

        let config = StoreConfig::new().entity("project", EntityConfig::new());
        let err = registry
            .validate_against(&config)
            .expect_err("comment is not configured");
        assert!(matches!(
            err,
            ExtensionError::UnknownEntity {
                host: ExtensionHost::Collection,
                ..
            }
        ));
    }
}
