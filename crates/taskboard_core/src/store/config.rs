//! Declarative store configuration and validation.
//!
//! # Responsibility
//! - Describe entity types, their default attributes, relations and foreign keys.
//! - Validate declaration-level invariants before a store is built.
//!
//! # Invariants
//! - Entity order is the declaration order (builder call order or JSON key order).
//! - Relations and `pk` entries may only point at configured entity types.
//! - Attribute defaults are informational; collections never apply them.

use crate::store::record::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

static ENTITY_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid entity name regex"));

/// Root store configuration (`config.models[entity] = {...}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default)]
    pub models: EntityTable,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entity declaration.
    pub fn entity(mut self, name: impl Into<String>, config: EntityConfig) -> Self {
        self.models.push(name.into(), config);
        self
    }

    /// Parses a JSON configuration document.
    ///
    /// The document may either be `{ "models": {...} }` or the bare models map.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        // Parsed straight from text: going through `Value` would lose key order.
        let wrapped_err = match serde_json::from_str::<StoreConfig>(source) {
            Ok(config) => return Ok(config),
            Err(err) => err,
        };
        if has_models_key(source) {
            return Err(ConfigError::Parse(wrapped_err.to_string()));
        }
        let models = serde_json::from_str::<EntityTable>(source)
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        Ok(Self { models })
    }

    /// Builds a configuration from an already parsed JSON value.
    ///
    /// Entity order follows the value's own map order.
    pub fn from_json_value(value: Value) -> Result<Self, ConfigError> {
        let wrapped = match value {
            Value::Object(map) if map.contains_key("models") => Value::Object(map),
            other => serde_json::json!({ "models": other }),
        };
        serde_json::from_value(wrapped).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn get(&self, entity: &str) -> Option<&EntityConfig> {
        self.models.get(entity)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.models.get(entity).is_some()
    }

    /// Entity names in declaration order.
    pub fn entity_names(&self) -> Vec<&str> {
        self.models.iter().map(|(name, _)| name).collect()
    }

    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::<&str>::new();
        for (name, _) in self.models.iter() {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyEntityName);
            }
            if !ENTITY_NAME_RE.is_match(name) {
                return Err(ConfigError::InvalidEntityName(name.to_string()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateEntity(name.to_string()));
            }
        }

        for (name, entity) in self.models.iter() {
            for (relation_name, relation) in &entity.relations {
                if !seen.contains(relation.pivot.as_str()) {
                    return Err(ConfigError::UnknownRelationPivot {
                        entity: name.to_string(),
                        relation: relation_name.clone(),
                        pivot: relation.pivot.clone(),
                    });
                }
                let from_is_blank = relation
                    .from
                    .as_deref()
                    .is_some_and(|from| from.trim().is_empty());
                if relation.to.trim().is_empty() || from_is_blank {
                    return Err(ConfigError::EmptyRelationKey {
                        entity: name.to_string(),
                        relation: relation_name.clone(),
                    });
                }
            }
            for (attr, target) in &entity.pk {
                if !seen.contains(target.as_str()) {
                    return Err(ConfigError::UnknownKeyTarget {
                        entity: name.to_string(),
                        attr: attr.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Per-entity declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    /// Default attribute values, informational only.
    #[serde(default)]
    pub attributes: Record,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationConfig>,
    /// Foreign-key attribute name -> parent entity type.
    #[serde(default)]
    pub pk: BTreeMap<String, String>,
}

impl EntityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, default: Value) -> Self {
        self.attributes.insert(name.into(), default);
        self
    }

    pub fn relation(mut self, name: impl Into<String>, relation: RelationConfig) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    pub fn pk(mut self, attr: impl Into<String>, entity: impl Into<String>) -> Self {
        self.pk.insert(attr.into(), entity.into());
        self
    }
}

/// One-to-many relation: records of `pivot` whose `to` attribute equals this
/// record's `from` attribute (`id` when unset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationConfig {
    pub pivot: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl RelationConfig {
    pub fn new(pivot: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            pivot: pivot.into(),
            to: to.into(),
            from: None,
        }
    }

    pub fn from_attr(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Attribute on the owning record used as the join value.
    pub fn from_key(&self) -> &str {
        self.from.as_deref().unwrap_or(crate::store::record::ID)
    }
}

/// Ordered entity map. Serialized as a JSON object, keeping key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityTable(Vec<(String, EntityConfig)>);

impl EntityTable {
    /// Inserts or replaces a declaration; replacement keeps the original slot.
    pub fn push(&mut self, name: String, config: EntityConfig) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = config,
            None => self.0.push((name, config)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EntityConfig> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, config)| config)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityConfig)> {
        self.0.iter().map(|(name, config)| (name.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for EntityTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, config) in &self.0 {
            map.serialize_entry(name, config)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EntityTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntityTableVisitor;

        impl<'de> Visitor<'de> for EntityTableVisitor {
            type Value = EntityTable;

            fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of entity name to entity config")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EntityTable, A::Error> {
                // Duplicate keys are kept so `validate` can report them.
                let mut entries = Vec::new();
                while let Some((name, config)) = access.next_entry::<String, EntityConfig>()? {
                    entries.push((name, config));
                }
                Ok(EntityTable(entries))
            }
        }

        deserializer.deserialize_map(EntityTableVisitor)
    }
}

/// Declaration-level configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyEntityName,
    InvalidEntityName(String),
    DuplicateEntity(String),
    UnknownRelationPivot {
        entity: String,
        relation: String,
        pivot: String,
    },
    EmptyRelationKey {
        entity: String,
        relation: String,
    },
    UnknownKeyTarget {
        entity: String,
        attr: String,
        target: String,
    },
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEntityName => write!(f, "entity name cannot be empty"),
            Self::InvalidEntityName(name) => write!(f, "entity name is invalid: `{name}`"),
            Self::DuplicateEntity(name) => write!(f, "entity declared twice: `{name}`"),
            Self::UnknownRelationPivot {
                entity,
                relation,
                pivot,
            } => write!(
                f,
                "relation `{entity}.{relation}` points at unknown entity `{pivot}`"
            ),
            Self::EmptyRelationKey { entity, relation } => {
                write!(f, "relation `{entity}.{relation}` has an empty key attribute")
            }
            Self::UnknownKeyTarget {
                entity,
                attr,
                target,
            } => write!(f, "pk `{entity}.{attr}` points at unknown entity `{target}`"),
            Self::Parse(message) => write!(f, "invalid store config document: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// True when `source` is a JSON object with a top-level `models` key.
fn has_models_key(source: &str) -> bool {
    serde_json::from_str::<serde_json::Map<String, Value>>(source)
        .map(|map| map.contains_key("models"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EntityConfig, RelationConfig, StoreConfig};
    use serde_json::json;

    #[test]
    fn json_config_keeps_declaration_order() {
        let config = StoreConfig::from_json_str(
            r#"{ "models": { "task": {}, "project": {}, "comment": {} } }"#,
        )
        .expect("config should parse");
        assert_eq!(config.entity_names(), vec!["task", "project", "comment"]);
    }

    #[test]
    fn bare_models_map_is_accepted() {
        let config = StoreConfig::from_json_value(json!({
            "project": { "attributes": { "name": "" } }
        }))
        .expect("bare map should parse");
        assert_eq!(
            config.get("project").unwrap().attributes.get("name"),
            Some(&json!(""))
        );
    }

    #[test]
    fn wrapped_document_reports_its_own_parse_error() {
        let err = StoreConfig::from_json_str(r#"{ "models": { "a": { "attributes": 3 } } }"#)
            .expect_err("attributes must be a map");
        let message = match err {
            ConfigError::Parse(message) => message,
            other => panic!("expected a parse error, got {other:?}"),
        };
        assert!(message.contains("invalid type"), "{message}");
        assert!(!message.contains("unknown field"), "{message}");
    }

    #[test]
    fn validate_rejects_unknown_relation_pivot() {
        let config = StoreConfig::new().entity(
            "project",
            EntityConfig::new().relation("tasks", RelationConfig::new("task", "projectId")),
        );
        let err = config.validate().expect_err("pivot must exist");
        assert!(matches!(err, ConfigError::UnknownRelationPivot { .. }));
    }

    #[test]
    fn validate_rejects_duplicate_and_invalid_names() {
        let duplicate = StoreConfig::from_json_str(r#"{ "task": {}, "task": {} }"#).unwrap();
        assert_eq!(
            duplicate.validate(),
            Err(ConfigError::DuplicateEntity("task".to_string()))
        );

        let invalid = StoreConfig::new().entity("has space", EntityConfig::new());
        assert_eq!(
            invalid.validate(),
            Err(ConfigError::InvalidEntityName("has space".to_string()))
        );
    }

    #[test]
    fn validate_rejects_unknown_pk_target() {
        let config =
            StoreConfig::new().entity("task", EntityConfig::new().pk("projectId", "project"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownKeyTarget { .. })
        ));
    }

    #[test]
    fn builder_replaces_existing_entity_in_place() {
        let config = StoreConfig::new()
            .entity("a", EntityConfig::new())
            .entity("b", EntityConfig::new())
            .entity("a", EntityConfig::new().attribute("x", json!(1)));
        assert_eq!(config.entity_names(), vec!["a", "b"]);
        assert!(config.get("a").unwrap().attributes.contains_key("x"));
    }
}
