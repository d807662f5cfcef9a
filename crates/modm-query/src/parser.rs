//! Pest-based parser for the textual legacy query form

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::query::*;

#[derive(Parser)]
#[grammar = "modm.pest"]
pub struct ModmParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Pest error: {0}")]
    Pest(#[from] Box<pest::error::Error<Rule>>),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::Pest(Box::new(err))
    }
}

/// Parse `Q('attr', 'op', value) & (Q(...) | Q(...))` into a [`Query`].
///
/// `&` binds tighter than `|`. Chains of the same operator collapse into a
/// single group.
pub fn parse(source: &str) -> Result<Query, ParseError> {
    let mut pairs = ModmParser::parse(Rule::query, source)?;
    let query_pair = pairs.next().ok_or_else(|| ParseError::Syntax("Empty input".to_string()))?;
    let expr = first_inner(query_pair)?;
    parse_expr(expr)
}

fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, ParseError> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| ParseError::Syntax(format!("Empty {:?}", rule)))
}

fn parse_expr(pair: Pair<Rule>) -> Result<Query, ParseError> {
    match pair.as_rule() {
        Rule::or_expr | Rule::and_expr => {
            let op = if pair.as_rule() == Rule::or_expr { GroupOp::Or } else { GroupOp::And };
            let mut inner = pair.into_inner();
            let first = inner
                .next()
                .ok_or_else(|| ParseError::Syntax("Empty expression".to_string()))?;
            let first = parse_expr(first)?;
            inner.try_fold(first, |acc, next| Ok(combine(op, acc, parse_expr(next)?)))
        }
        Rule::q_call => parse_q_call(pair),
        other => Err(ParseError::Syntax(format!("Cannot parse expr: {:?}", other))),
    }
}

fn parse_q_call(pair: Pair<Rule>) -> Result<Query, ParseError> {
    let mut inner = pair.into_inner();
    let mut next = |what: &str| {
        inner
            .next()
            .ok_or_else(|| ParseError::Syntax(format!("Q() is missing its {}", what)))
    };
    let attribute = parse_string(next("attribute")?)?;
    let operator = parse_string(next("operator")?)?;
    let argument = parse_value(next("argument")?)?;
    Ok(Query::Raw(RawQuery { attribute, operator, argument }))
}

fn parse_value(pair: Pair<Rule>) -> Result<Value, ParseError> {
    match pair.as_rule() {
        Rule::null => Ok(Value::Null),
        Rule::boolean => Ok(Value::Bool(matches!(pair.as_str(), "True" | "true"))),
        Rule::number => {
            let text = pair.as_str();
            if text.contains('.') {
                text.parse()
                    .map(Value::Float)
                    .map_err(|e| ParseError::Syntax(format!("Invalid number {}: {}", text, e)))
            } else {
                text.parse()
                    .map(Value::Int)
                    .map_err(|e| ParseError::Syntax(format!("Invalid number {}: {}", text, e)))
            }
        }
        Rule::string => parse_string(pair).map(Value::String),
        Rule::list => pair
            .into_inner()
            .map(parse_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(ParseError::Syntax(format!("Invalid value: {:?}", other))),
    }
}

fn parse_string(pair: Pair<Rule>) -> Result<String, ParseError> {
    let raw = first_inner(pair)?.as_str();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => return Err(ParseError::Syntax("Dangling escape".to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_q() {
        let query = parse("Q('tags', 'eq', 'foo')").unwrap();
        assert_eq!(query, q("tags", "eq", "foo"));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let query = parse("Q('a', 'eq', 1) | Q('b', 'eq', 2) & Q('c', 'eq', 3)").unwrap();
        let expected = or(q("a", "eq", 1), and(q("b", "eq", 2), q("c", "eq", 3)));
        assert_eq!(query, expected);
    }

    #[test]
    fn test_parse_values() {
        let query = parse(r#"Q("x", "in", [1, 2.5, "s", None, True, false, []])"#).unwrap();
        let Query::Raw(raw) = query else {
            panic!("expected atom");
        };
        assert_eq!(
            raw.argument,
            Value::Array(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::String("s".to_string()),
                Value::Null,
                Value::Bool(true),
                Value::Bool(false),
                Value::Array(vec![]),
            ])
        );
    }

    #[test]
    fn test_escaped_quote() {
        let query = parse(r"Q('title', 'eq', 'it\'s')").unwrap();
        assert_eq!(query, q("title", "eq", "it's"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse("Q('a', 'eq')").is_err());
        assert!(parse("").is_err());
        assert!(parse("Q('a', 'eq', 1) &").is_err());
    }
}
