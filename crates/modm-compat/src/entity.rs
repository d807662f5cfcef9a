//! Entity type descriptors

use orm_filter::{FieldLookup, ModelSchema};

/// Legacy name of the identity attribute.
pub const ID_ATTRIBUTE: &str = "_id";

/// What the translator needs to know about a target model.
pub trait EntityType: Send + Sync {
    fn name(&self) -> &str;

    /// Current lookup path for a legacy attribute name, if it was renamed.
    fn alias(&self, attribute: &str) -> Option<&str>;

    /// Reflect a field by exact name.
    fn lookup_field(&self, name: &str) -> FieldLookup;

    /// Field that backs `_id` on models carrying a GUID.
    fn identity_field(&self) -> Option<&str> {
        None
    }

    fn resolve_alias<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.alias(attribute).unwrap_or(attribute)
    }

    /// Field reflection with `_id` redirected to the identity field.
    fn reflect(&self, attribute: &str) -> FieldLookup {
        let name = match self.identity_field() {
            Some(identity) if attribute == ID_ATTRIBUTE => identity,
            _ => attribute,
        };
        self.lookup_field(name)
    }
}

impl EntityType for ModelSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn alias(&self, attribute: &str) -> Option<&str> {
        self.aliases.get(attribute).map(String::as_str)
    }

    fn lookup_field(&self, name: &str) -> FieldLookup {
        self.find_field(name)
    }

    fn identity_field(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orm_filter::FieldKind;

    #[test]
    fn test_reflect_redirects_id() {
        let node = ModelSchema::new("Node")
            .with_identity("guid")
            .with_field("guid", FieldKind::Relation);

        assert_eq!(node.reflect("_id"), FieldLookup::Found(FieldKind::Relation));
        assert_eq!(node.lookup_field("_id"), FieldLookup::NotFound);
    }

    #[test]
    fn test_resolve_alias_exact_match_only() {
        let log = ModelSchema::new("PreprintLog").with_alias("user", "user__guids___id");

        assert_eq!(log.resolve_alias("user"), "user__guids___id");
        assert_eq!(log.resolve_alias("user.name"), "user.name");
        assert_eq!(log.resolve_alias("USER"), "USER");
    }
}
