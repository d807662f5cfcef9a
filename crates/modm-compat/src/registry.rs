//! Model registry: alias tables and field kinds per model

use orm_filter::{FieldKind, ModelSchema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::entity::EntityType;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// On-disk catalog layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Catalog {
    #[serde(default)]
    models: Vec<ModelSchema>,
}

pub struct ModelRegistry {
    models: HashMap<String, ModelSchema>,
}

impl ModelRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Registry preloaded with the models that ship aliases.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        // TODO: drop once callers query preprint/user by relation path
        self.register(
            ModelSchema::new("PreprintLog")
                .with_alias("preprint", "preprint__guids___id")
                .with_alias("user", "user__guids___id")
                .with_field("_id", FieldKind::Scalar)
                .with_field("action", FieldKind::Scalar)
                .with_field("params", FieldKind::Scalar)
                .with_field("should_hide", FieldKind::Scalar)
                .with_field("foreign_user", FieldKind::Scalar)
                .with_field("created", FieldKind::Scalar)
                .with_field("modified", FieldKind::Scalar)
                .with_field("user", FieldKind::Relation)
                .with_field("preprint", FieldKind::Relation),
        );
    }

    /// Add or replace a model.
    pub fn register(&mut self, schema: ModelSchema) {
        debug!(model = %schema.name, aliases = schema.aliases.len(), fields = schema.fields.len(), "registered model");
        self.models.insert(schema.name.clone(), schema);
    }

    pub fn get(&self, name: &str) -> Result<&ModelSchema, RegistryError> {
        self.models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }

    /// Descriptor for the translator.
    pub fn entity(&self, name: &str) -> Result<&dyn EntityType, RegistryError> {
        self.get(name).map(|schema| schema as &dyn EntityType)
    }

    /// Model names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Register every model in a YAML catalog, replacing same-named ones.
    pub fn extend_from_yaml(&mut self, yaml: &str) -> Result<(), RegistryError> {
        let catalog: Catalog = serde_yaml::from_str(yaml)?;
        for schema in catalog.models {
            self.register(schema);
        }
        Ok(())
    }

    /// Builtins plus the models of a YAML catalog file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        let mut registry = Self::with_builtins();
        registry.extend_from_yaml(&contents)?;
        Ok(registry)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orm_filter::FieldLookup;

    #[test]
    fn test_builtin_lookup() {
        let registry = ModelRegistry::default();

        let log = registry.get("PreprintLog").unwrap();
        assert_eq!(log.aliases.get("user").map(String::as_str), Some("user__guids___id"));
        assert_eq!(log.find_field("preprint"), FieldLookup::Found(FieldKind::Relation));
    }

    #[test]
    fn test_missing_model() {
        let registry = ModelRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(registry.get("Node"), Err(RegistryError::ModelNotFound(name)) if name == "Node"));
    }

    #[test]
    fn test_extend_from_yaml() {
        let mut registry = ModelRegistry::with_builtins();
        registry
            .extend_from_yaml(
                r#"
models:
  - name: Preprint
    identity: guid
    fields:
      guid: relation
      tags: array
  - name: PreprintLog
    aliases:
      preprint: preprint__guids___id
"#,
            )
            .unwrap();

        assert_eq!(registry.names(), vec!["Preprint", "PreprintLog"]);
        let preprint = registry.entity("Preprint").unwrap();
        assert_eq!(preprint.identity_field(), Some("guid"));
        assert_eq!(preprint.lookup_field("tags"), FieldLookup::Found(FieldKind::Array));

        // Replaced wholesale, not merged
        let log = registry.get("PreprintLog").unwrap();
        assert!(log.fields.is_empty());
    }

    #[test]
    fn test_bad_yaml() {
        let mut registry = ModelRegistry::new();
        let err = registry.extend_from_yaml("models: [{fields: {a: sideways}}]").unwrap_err();
        assert!(matches!(err, RegistryError::Yaml(_)));
    }
}
