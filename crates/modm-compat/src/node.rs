//! Compatibility query nodes
//!
//! `CompatQ` is an atomic query that has already been lifted out of the
//! legacy algebra: its operator is still spelled the legacy way, but it knows
//! how to render itself as an ORM lookup. `CompoundQ` combines any mix of
//! legacy queries and compat nodes.

use modm_query::{GroupOp, Query};
use orm_filter::{Filter, Lookup, Value, PK};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

use crate::entity::ID_ATTRIBUTE;
use crate::translate::TranslateError;

pub(crate) const EQ: &str = "eq";
pub(crate) const NE: &str = "ne";
pub(crate) const EXACT: &str = "exact";
pub(crate) const CONTAINS: &str = "contains";
pub(crate) const ISNULL: &str = "isnull";

/// Legacy operator -> ORM lookup name. Anything missing passes through.
const OPERATOR_MAP: &[(&str, &str)] = &[(EQ, EXACT)];

fn map_operator(op: &str) -> &str {
    OPERATOR_MAP
        .iter()
        .find(|(legacy, _)| *legacy == op)
        .map_or(op, |(_, lookup)| lookup)
}

/// Atomic query ready to render as a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatQ {
    attribute: String,
    operator: String,
    #[serde(default)]
    argument: Value,
}

impl CompatQ {
    pub fn new(attribute: impl Into<String>, operator: impl Into<String>, argument: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            operator: operator.into(),
            argument: argument.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn argument(&self) -> &Value {
        &self.argument
    }

    /// Lookup path, with `_id` replaced by the primary key.
    pub fn key(&self) -> &str {
        if self.attribute == ID_ATTRIBUTE {
            PK
        } else {
            &self.attribute
        }
    }

    /// Lookup name. A null argument always becomes `isnull`.
    pub fn op(&self) -> &str {
        if self.argument == Value::Null {
            return ISNULL;
        }
        map_operator(&self.operator)
    }

    /// Lookup argument. For a null argument: `true` iff the operator was `eq`.
    pub fn val(&self) -> Value {
        if self.argument == Value::Null {
            return Value::Bool(self.operator == EQ);
        }
        self.argument.clone()
    }

    /// Same query against a different attribute name.
    pub fn with_attribute(&self, attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            operator: self.operator.clone(),
            argument: self.argument.clone(),
        }
    }

    /// Render as an ORM filter. `ne` has no lookup of its own, so it becomes
    /// the negation of the `exact` lookup.
    pub fn to_filter(&self) -> Filter {
        let op = self.op();
        if op == NE {
            return Filter::from(Lookup::from_path(self.key(), EXACT, self.val())).negate();
        }
        Filter::from(Lookup::from_path(self.key(), op, self.val()))
    }
}

impl fmt::Display for CompatQ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Q({}, {}, {})>", self.key(), self.op(), self.val())
    }
}

/// AND/OR over compat nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundQ {
    operator: GroupOp,
    #[serde(default)]
    nodes: Vec<QueryNode>,
}

impl CompoundQ {
    pub fn new(operator: GroupOp, nodes: Vec<QueryNode>) -> Self {
        Self { operator, nodes }
    }

    pub fn operator(&self) -> GroupOp {
        self.operator
    }

    pub fn nodes(&self) -> &[QueryNode] {
        &self.nodes
    }
}

/// Every shape the translator accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryNode {
    /// Straight from the legacy algebra.
    Legacy(Query),
    /// Already lifted atomic query.
    Compat(CompatQ),
    Compound(CompoundQ),
}

impl QueryNode {
    pub fn and(self, other: QueryNode) -> QueryNode {
        combine(GroupOp::And, self, other)
    }

    pub fn or(self, other: QueryNode) -> QueryNode {
        combine(GroupOp::Or, self, other)
    }

    /// Decode an untyped node.
    ///
    /// Accepts the tagged form (`{"legacy": ..}`, `{"compat": ..}`,
    /// `{"compound": ..}`) as well as bare legacy atoms and groups. Anything
    /// else is `UnknownNodeType`.
    pub fn from_json(value: Json) -> Result<Self, TranslateError> {
        let kind = json_kind(&value);
        let Json::Object(mut map) = value else {
            return Err(TranslateError::UnknownNodeType(kind.to_string()));
        };

        if map.len() == 1 {
            if let Some(tag) = map.keys().next().cloned() {
                if let Some(body) = map.remove(&tag) {
                    match tag.as_str() {
                        "legacy" => return decode(body).map(QueryNode::Legacy),
                        "compat" => return decode(body).map(QueryNode::Compat),
                        "compound" => return decode_compound(body),
                        _ => {
                            map.insert(tag, body);
                        }
                    }
                }
            }
        }

        if map.contains_key("attribute") {
            return decode(Json::Object(map)).map(QueryNode::Legacy);
        }
        if map.contains_key("nodes") {
            let body = Json::Object(map);
            // Bare groups over tagged or lifted children decode as compounds
            return match decode::<Query>(body.clone()) {
                Ok(query) => Ok(QueryNode::Legacy(query)),
                Err(_) => decode_compound(body),
            };
        }
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        Err(TranslateError::UnknownNodeType(format!("object with keys [{}]", keys.join(", "))))
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Json) -> Result<T, TranslateError> {
    serde_json::from_value(body).map_err(|e| TranslateError::UnknownNodeType(e.to_string()))
}

fn decode_compound(body: Json) -> Result<QueryNode, TranslateError> {
    let kind = json_kind(&body);
    let Json::Object(mut map) = body else {
        return Err(TranslateError::UnknownNodeType(format!("compound body is {}", kind)));
    };
    let operator: GroupOp = decode(map.remove("operator").unwrap_or(Json::Null))?;
    let nodes = match map.remove("nodes") {
        Some(Json::Array(items)) => items
            .into_iter()
            .map(QueryNode::from_json)
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(TranslateError::UnknownNodeType(format!("compound nodes is {}", json_kind(&other))))
        }
        None => Vec::new(),
    };
    Ok(QueryNode::Compound(CompoundQ { operator, nodes }))
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn combine(operator: GroupOp, left: QueryNode, right: QueryNode) -> QueryNode {
    let mut nodes = Vec::new();
    for side in [left, right] {
        match side {
            QueryNode::Compound(compound) if compound.operator == operator => nodes.extend(compound.nodes),
            QueryNode::Legacy(Query::Group(group)) if group.operator == operator => {
                nodes.extend(group.nodes.into_iter().map(QueryNode::Legacy))
            }
            other => nodes.push(other),
        }
    }
    QueryNode::Compound(CompoundQ { operator, nodes })
}

impl From<Query> for QueryNode {
    fn from(query: Query) -> Self {
        QueryNode::Legacy(query)
    }
}

impl From<CompatQ> for QueryNode {
    fn from(q: CompatQ) -> Self {
        QueryNode::Compat(q)
    }
}

impl From<CompoundQ> for QueryNode {
    fn from(compound: CompoundQ) -> Self {
        QueryNode::Compound(compound)
    }
}
