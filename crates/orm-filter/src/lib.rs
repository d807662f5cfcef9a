//! ORM filter expressions
//!
//! The relational side of the compatibility layer: Django-style keyword
//! lookups (`relation__field__op = value`) combined with AND, OR and NOT.
//! All types are deterministically serializable so a translated filter can
//! be fingerprinted and cached.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub mod eval;
mod types;
mod value;

pub use types::*;
pub use value::Value;

/// Separator between relation hops and the trailing lookup name.
pub const LOOKUP_SEP: &str = "__";

/// Canonical primary-key reference.
pub const PK: &str = "pk";

/// Join path segments and a lookup name into a lookup key.
///
/// `join_lookup(["preprint", "guids", "_id"], "exact")` is
/// `"preprint__guids___id__exact"`.
pub fn join_lookup<'a, I>(segments: I, lookup: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut key = segments.into_iter().collect::<Vec<_>>().join(LOOKUP_SEP);
    if !lookup.is_empty() {
        if !key.is_empty() {
            key.push_str(LOOKUP_SEP);
        }
        key.push_str(lookup);
    }
    key
}

/// A single keyword lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    pub key: String,
    pub value: Value,
}

impl Lookup {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build from a dotted attribute path, e.g. `("user.guids._id", "exact")`.
    pub fn from_path(path: &str, lookup: &str, value: impl Into<Value>) -> Self {
        Self::new(join_lookup(path.split('.'), lookup), value)
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Lookup(Lookup),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn lookup(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lookup(Lookup::new(key, value))
    }

    /// Conjunction; AND children on either side are spliced in.
    pub fn and(self, other: Filter) -> Filter {
        let mut children = Vec::new();
        for side in [self, other] {
            match side {
                Filter::And(inner) => children.extend(inner),
                other => children.push(other),
            }
        }
        Filter::And(children)
    }

    /// Disjunction; OR children on either side are spliced in.
    pub fn or(self, other: Filter) -> Filter {
        let mut children = Vec::new();
        for side in [self, other] {
            match side {
                Filter::Or(inner) => children.extend(inner),
                other => children.push(other),
            }
        }
        Filter::Or(children)
    }

    /// Logical negation. Double negation is kept as written.
    pub fn negate(self) -> Filter {
        Filter::Not(Box::new(self))
    }

    /// Every lookup in the tree, left to right.
    pub fn lookups(&self) -> Vec<&Lookup> {
        let mut out = Vec::new();
        self.collect_lookups(&mut out);
        out
    }

    fn collect_lookups<'a>(&'a self, out: &mut Vec<&'a Lookup>) {
        match self {
            Filter::Lookup(lookup) => out.push(lookup),
            Filter::And(children) | Filter::Or(children) => {
                for child in children {
                    child.collect_lookups(out);
                }
            }
            Filter::Not(inner) => inner.collect_lookups(out),
        }
    }

    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl From<Lookup> for Filter {
    fn from(lookup: Lookup) -> Self {
        Filter::Lookup(lookup)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Lookup(lookup) => write!(f, "Q({}={})", lookup.key, lookup.value),
            Filter::Not(inner) => match inner.as_ref() {
                Filter::Lookup(_) | Filter::Not(_) => write!(f, "~{}", inner),
                _ => write!(f, "~({})", inner),
            },
            Filter::And(children) => write_joined(f, children, " & ", |c| matches!(c, Filter::Or(_))),
            Filter::Or(children) => write_joined(f, children, " | ", |c| matches!(c, Filter::And(_))),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[Filter],
    sep: &str,
    needs_parens: impl Fn(&Filter) -> bool,
) -> fmt::Result {
    if children.is_empty() {
        return write!(f, "Q()");
    }
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if needs_parens(child) {
            write!(f, "({})", child)?;
        } else {
            write!(f, "{}", child)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_lookup() {
        assert_eq!(join_lookup(["preprint", "guids", "_id"], "exact"), "preprint__guids___id__exact");
        assert_eq!(join_lookup(["pk"], ""), "pk");
    }

    #[test]
    fn test_and_or_flatten() {
        let a = Filter::lookup("a__exact", 1);
        let b = Filter::lookup("b__exact", 2);
        let c = Filter::lookup("c__exact", 3);

        let conj = a.clone().and(b.clone()).and(c.clone());
        assert_eq!(conj, Filter::And(vec![a.clone(), b.clone(), c.clone()]));

        let mixed = a.clone().and(b.clone()).or(c.clone());
        assert_eq!(mixed, Filter::Or(vec![Filter::And(vec![a, b]), c]));
    }

    #[test]
    fn test_display() {
        let filter = Filter::lookup("tags__contains", vec!["foo"])
            .and(Filter::lookup("pk__exact", "xyz").negate().or(Filter::lookup("deleted__isnull", true)));
        assert_eq!(
            filter.to_string(),
            "Q(tags__contains=['foo']) & (~Q(pk__exact='xyz') | Q(deleted__isnull=True))"
        );
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let filter1 = Filter::lookup("a__exact", "x").or(Filter::lookup("b__gt", 3));
        let filter2 = filter1.clone();
        assert_eq!(filter1.fingerprint().unwrap(), filter2.fingerprint().unwrap());

        let other = Filter::lookup("a__exact", "y").or(Filter::lookup("b__gt", 3));
        assert_ne!(filter1.fingerprint().unwrap(), other.fingerprint().unwrap());
    }

    #[test]
    fn test_json_round_trip() {
        let filter = Filter::lookup("user__guids___id__exact", "u1")
            .and(Filter::lookup("action__exact", "tag_added").negate());
        let json = serde_json::to_string(&filter).unwrap();
        let parsed: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, filter);
    }
}
