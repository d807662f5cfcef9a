//! In-memory reference evaluation of filters against JSON records
//!
//! Records are JSON objects; relations are nested objects or arrays of
//! objects. A lookup matches if any value reached through the relation path
//! satisfies it. Unknown lookup names never match.

use serde_json::Value as Json;
use std::cmp::Ordering;

use crate::{Filter, Lookup, LOOKUP_SEP, PK};

const MAX_PATH_DEPTH: usize = 32;

/// Lookup names recognized as the trailing key segment.
pub const LOOKUPS: &[&str] = &[
    "exact",
    "iexact",
    "contains",
    "icontains",
    "in",
    "gt",
    "gte",
    "lt",
    "lte",
    "startswith",
    "istartswith",
    "endswith",
    "iendswith",
    "isnull",
];

pub fn matches(filter: &Filter, record: &Json) -> bool {
    match filter {
        Filter::Lookup(lookup) => matches_lookup(lookup, record),
        Filter::And(children) => children.iter().all(|c| matches(c, record)),
        Filter::Or(children) => children.iter().any(|c| matches(c, record)),
        Filter::Not(inner) => !matches(inner, record),
    }
}

/// Records satisfying `filter`, in input order.
pub fn filter_records<'a>(filter: &Filter, records: &'a [Json]) -> Vec<&'a Json> {
    records.iter().filter(|r| matches(filter, r)).collect()
}

fn matches_lookup(lookup: &Lookup, record: &Json) -> bool {
    let mut segments: Vec<&str> = lookup.key.split(LOOKUP_SEP).collect();
    let op = match segments.last().copied() {
        Some(last) if segments.len() > 1 && LOOKUPS.contains(&last) => {
            segments.pop();
            last
        }
        _ => "exact",
    };
    if segments.len() > MAX_PATH_DEPTH {
        return false;
    }

    let mut reached = Vec::new();
    resolve(record, &segments, &mut reached);
    let target = lookup.value.to_json();

    if op == "isnull" {
        let is_null = reached.iter().all(|v| v.is_null());
        return target.as_bool().is_some_and(|want| want == is_null);
    }
    reached.iter().any(|v| compare(op, v, &target))
}

fn resolve<'a>(current: &'a Json, segments: &[&str], out: &mut Vec<&'a Json>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(current);
        return;
    };
    match current {
        Json::Object(map) => {
            let field = if *head == PK { map.get(PK).or_else(|| map.get("id")) } else { map.get(*head) };
            if let Some(next) = field {
                resolve(next, rest, out);
            }
        }
        // To-many relation: fan out over related records
        Json::Array(items) => {
            for item in items {
                resolve(item, segments, out);
            }
        }
        _ => {}
    }
}

fn compare(op: &str, actual: &Json, target: &Json) -> bool {
    match op {
        "exact" => json_eq(actual, target),
        "iexact" => str_pair(actual, target).is_some_and(|(a, t)| a.to_lowercase() == t.to_lowercase()),
        "contains" => match (actual, target) {
            (Json::Array(items), Json::Array(wanted)) => {
                wanted.iter().all(|w| items.iter().any(|i| json_eq(i, w)))
            }
            (Json::Array(items), single) => items.iter().any(|i| json_eq(i, single)),
            (Json::String(a), Json::String(t)) => a.contains(t.as_str()),
            _ => false,
        },
        "icontains" => {
            str_pair(actual, target).is_some_and(|(a, t)| a.to_lowercase().contains(&t.to_lowercase()))
        }
        "in" => match target {
            Json::Array(options) => options.iter().any(|o| json_eq(actual, o)),
            _ => false,
        },
        "gt" => order(actual, target) == Some(Ordering::Greater),
        "gte" => matches!(order(actual, target), Some(Ordering::Greater | Ordering::Equal)),
        "lt" => order(actual, target) == Some(Ordering::Less),
        "lte" => matches!(order(actual, target), Some(Ordering::Less | Ordering::Equal)),
        "startswith" => str_pair(actual, target).is_some_and(|(a, t)| a.starts_with(t)),
        "istartswith" => {
            str_pair(actual, target).is_some_and(|(a, t)| a.to_lowercase().starts_with(&t.to_lowercase()))
        }
        "endswith" => str_pair(actual, target).is_some_and(|(a, t)| a.ends_with(t)),
        "iendswith" => {
            str_pair(actual, target).is_some_and(|(a, t)| a.to_lowercase().ends_with(&t.to_lowercase()))
        }
        _ => false,
    }
}

fn str_pair<'a>(a: &'a Json, b: &'a Json) -> Option<(&'a str, &'a str)> {
    Some((a.as_str()?, b.as_str()?))
}

fn json_eq(a: &Json, b: &Json) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}

fn order(a: &Json, b: &Json) -> Option<Ordering> {
    match (a, b) {
        (Json::Number(_), Json::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Json::String(x), Json::String(y)) => Some(x.cmp(y)),
        (Json::Bool(x), Json::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
