//! Model metadata the ORM exposes through reflection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage shape of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Ordinary single-valued column.
    Scalar,
    /// Multi-valued column (e.g. a Postgres `ArrayField`).
    Array,
    /// Foreign key or many-to-many.
    Relation,
}

/// Result of reflecting a field by name.
///
/// Fields without introspectable type information (generic relations, or
/// names that are really relation paths) come back as `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLookup {
    Found(FieldKind),
    NotFound,
}

impl FieldLookup {
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldLookup::Found(kind) => Some(*kind),
            FieldLookup::NotFound => None,
        }
    }
}

/// Reflected description of one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,

    /// Field backing the legacy `_id` attribute, for models with GUIDs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Legacy attribute name -> current lookup path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldKind>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_identity(mut self, field: impl Into<String>) -> Self {
        self.identity = Some(field.into());
        self
    }

    pub fn with_alias(mut self, legacy: impl Into<String>, path: impl Into<String>) -> Self {
        self.aliases.insert(legacy.into(), path.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Exact-name field reflection; relation paths are not followed.
    pub fn find_field(&self, name: &str) -> FieldLookup {
        self.fields
            .get(name)
            .map_or(FieldLookup::NotFound, |kind| FieldLookup::Found(*kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_field() {
        let schema = ModelSchema::new("Preprint")
            .with_field("tags", FieldKind::Array)
            .with_field("node", FieldKind::Relation);

        assert_eq!(schema.find_field("tags"), FieldLookup::Found(FieldKind::Array));
        assert_eq!(schema.find_field("node").kind(), Some(FieldKind::Relation));
        assert_eq!(schema.find_field("node__title"), FieldLookup::NotFound);
    }

    #[test]
    fn test_deserialize_defaults() {
        let schema: ModelSchema = serde_json::from_str(
            r#"{"name": "Node", "identity": "guid", "fields": {"tags": "array", "title": "scalar"}}"#,
        )
        .unwrap();
        assert_eq!(schema.identity.as_deref(), Some("guid"));
        assert!(schema.aliases.is_empty());
        assert_eq!(schema.find_field("title"), FieldLookup::Found(FieldKind::Scalar));
    }
}
