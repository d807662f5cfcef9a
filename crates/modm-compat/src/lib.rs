//! modm-compat - translate legacy modular-odm queries into ORM filters
//!
//! ```
//! use modm_compat::{to_orm_filter, FieldKind, ModelSchema};
//! use modm_query::q;
//!
//! let preprint = ModelSchema::new("Preprint")
//!     .with_identity("guid")
//!     .with_field("guid", FieldKind::Relation)
//!     .with_field("tags", FieldKind::Array);
//!
//! let filter = to_orm_filter(&q("tags", "eq", "foo"), Some(&preprint)).unwrap();
//! assert_eq!(filter.to_string(), "Q(tags__contains=['foo'])");
//! ```

mod entity;
mod node;
mod registry;
mod translate;

pub use entity::{EntityType, ID_ATTRIBUTE};
pub use node::{CompatQ, CompoundQ, QueryNode};
pub use registry::{ModelRegistry, RegistryError};
pub use translate::{to_orm_filter, translate, TranslateError, Translator};

pub use orm_filter::{FieldKind, FieldLookup, Filter, ModelSchema};
