//! Query types for the legacy algebra
//!
//! Nodes are immutable once built. Combining goes through [`and`] / [`or`],
//! which always return a fresh group.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Argument of an atomic query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write_quoted(f, s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "'")?;
    for c in s.chars() {
        match c {
            '\'' => write!(f, "\\'")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "'")
}

/// Atomic predicate: `Q(attribute, operator, argument)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuery {
    pub attribute: String,
    pub operator: String,
    #[serde(default)]
    pub argument: Value,
}

impl RawQuery {
    pub fn new(
        attribute: impl Into<String>,
        operator: impl Into<String>,
        argument: impl Into<Value>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator: operator.into(),
            argument: argument.into(),
        }
    }
}

impl fmt::Display for RawQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q(")?;
        write_quoted(f, &self.attribute)?;
        write!(f, ", ")?;
        write_quoted(f, &self.operator)?;
        write!(f, ", {})", self.argument)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOp {
    And,
    Or,
}

impl GroupOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOp::And => "and",
            GroupOp::Or => "or",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            GroupOp::And => " & ",
            GroupOp::Or => " | ",
        }
    }
}

impl fmt::Display for GroupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean combination of queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryGroup {
    pub operator: GroupOp,
    #[serde(default)]
    pub nodes: Vec<Query>,
}

impl QueryGroup {
    pub fn new(operator: GroupOp, nodes: Vec<Query>) -> Self {
        Self { operator, nodes }
    }
}

/// A legacy query tree. Untagged on the wire: `{attribute, operator, argument}`
/// is an atom, `{operator, nodes}` is a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    Raw(RawQuery),
    Group(QueryGroup),
}

impl From<RawQuery> for Query {
    fn from(raw: RawQuery) -> Self {
        Query::Raw(raw)
    }
}

impl From<QueryGroup> for Query {
    fn from(group: QueryGroup) -> Self {
        Query::Group(group)
    }
}

/// Shorthand for an atomic query.
pub fn q(attribute: impl Into<String>, operator: impl Into<String>, argument: impl Into<Value>) -> Query {
    Query::Raw(RawQuery::new(attribute, operator, argument))
}

/// Conjunction. AND groups on either side are spliced in place.
pub fn and(left: Query, right: Query) -> Query {
    combine(GroupOp::And, left, right)
}

/// Disjunction. OR groups on either side are spliced in place.
pub fn or(left: Query, right: Query) -> Query {
    combine(GroupOp::Or, left, right)
}

pub(crate) fn combine(operator: GroupOp, left: Query, right: Query) -> Query {
    let mut nodes = Vec::new();
    for side in [left, right] {
        match side {
            Query::Group(group) if group.operator == operator => nodes.extend(group.nodes),
            other => nodes.push(other),
        }
    }
    Query::Group(QueryGroup { operator, nodes })
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Raw(raw) => write!(f, "{}", raw),
            Query::Group(group) => {
                if group.nodes.is_empty() {
                    // No textual form for an empty group
                    return write!(f, "{}()", group.operator);
                }
                for (i, node) in group.nodes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(group.operator.symbol())?;
                    }
                    match node {
                        Query::Group(inner) if inner.operator != group.operator => {
                            write!(f, "({})", node)?
                        }
                        _ => write!(f, "{}", node)?,
                    }
                }
                Ok(())
            }
        }
    }
}
