//! Legacy query → ORM filter translation

use modm_query::{GroupOp, Query, RawQuery};
use orm_filter::{FieldKind, FieldLookup, Filter, Value};
use tracing::{debug, trace};

use crate::entity::EntityType;
use crate::node::{CompatQ, QueryNode, CONTAINS, EQ};

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Unknown query node type: {0}")]
    UnknownNodeType(String),

    #[error("Cannot translate an empty {operator} group")]
    EmptyCompound { operator: GroupOp },
}

/// Translator for legacy queries → ORM filters, optionally bound to a model.
#[derive(Clone, Copy, Default)]
pub struct Translator<'a> {
    entity: Option<&'a dyn EntityType>,
}

impl<'a> Translator<'a> {
    /// Translator without a model: no aliasing, no array correction.
    pub fn new() -> Self {
        Self { entity: None }
    }

    pub fn for_entity(entity: &'a dyn EntityType) -> Self {
        Self { entity: Some(entity) }
    }

    pub fn translate(&self, node: &QueryNode) -> Result<Filter, TranslateError> {
        match node {
            QueryNode::Legacy(query) => self.translate_query(query),
            QueryNode::Compat(q) => Ok(self.realias(q).to_filter()),
            QueryNode::Compound(compound) => fold(
                compound.operator(),
                compound.nodes().iter().map(|child| self.translate(child)),
            ),
        }
    }

    pub fn translate_query(&self, query: &Query) -> Result<Filter, TranslateError> {
        match query {
            Query::Raw(raw) => Ok(self.lift(raw).to_filter()),
            Query::Group(group) => fold(
                group.operator,
                group.nodes.iter().map(|child| self.translate_query(child)),
            ),
        }
    }

    /// Lift a legacy atom: resolve its alias and correct `eq` on array fields.
    pub fn lift(&self, raw: &RawQuery) -> CompatQ {
        let argument = convert_value(&raw.argument);
        let Some(entity) = self.entity else {
            return CompatQ::new(raw.attribute.as_str(), raw.operator.as_str(), argument);
        };

        let attribute = entity.resolve_alias(&raw.attribute);
        if attribute != raw.attribute {
            debug!(model = entity.name(), from = %raw.attribute, to = %attribute, "resolved field alias");
        }

        // `eq` on an array field means membership in the legacy store
        let field = entity.reflect(attribute);
        if raw.operator == EQ && field == FieldLookup::Found(FieldKind::Array) {
            debug!(model = entity.name(), field = %attribute, "array field equality rewritten to contains");
            return CompatQ::new(attribute, CONTAINS, Value::Array(vec![argument]));
        }
        if field == FieldLookup::NotFound {
            trace!(model = entity.name(), field = %attribute, "field not reflected, skipping type check");
        }
        CompatQ::new(attribute, raw.operator.as_str(), argument)
    }

    /// Already-lifted atoms only get their alias re-resolved.
    fn realias(&self, q: &CompatQ) -> CompatQ {
        match self.entity.and_then(|entity| entity.alias(q.attribute())) {
            Some(path) => q.with_attribute(path),
            None => q.clone(),
        }
    }
}

/// Reduce translated children left to right. No identity element is
/// synthesized for an empty group.
fn fold<I>(operator: GroupOp, children: I) -> Result<Filter, TranslateError>
where
    I: Iterator<Item = Result<Filter, TranslateError>>,
{
    let mut acc: Option<Filter> = None;
    for child in children {
        let child = child?;
        acc = Some(match acc {
            None => child,
            Some(prev) => match operator {
                GroupOp::And => prev.and(child),
                GroupOp::Or => prev.or(child),
            },
        });
    }
    let filter = acc.ok_or(TranslateError::EmptyCompound { operator })?;
    trace!(%operator, %filter, "folded group");
    Ok(filter)
}

fn convert_value(value: &modm_query::Value) -> Value {
    use modm_query::Value as Legacy;
    match value {
        Legacy::Null => Value::Null,
        Legacy::Bool(b) => Value::Bool(*b),
        Legacy::Int(i) => Value::Int(*i),
        Legacy::Float(f) => Value::Float(*f),
        Legacy::String(s) => Value::String(s.clone()),
        Legacy::Array(items) => Value::Array(items.iter().map(convert_value).collect()),
    }
}

/// Translate any query node, optionally against a model.
pub fn translate(node: &QueryNode, entity: Option<&dyn EntityType>) -> Result<Filter, TranslateError> {
    Translator { entity }.translate(node)
}

/// Translate a legacy query, optionally against a model.
pub fn to_orm_filter(query: &Query, entity: Option<&dyn EntityType>) -> Result<Filter, TranslateError> {
    Translator { entity }.translate_query(query)
}
