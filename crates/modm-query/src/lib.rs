//! modm-query - legacy document-store query algebra
//!
//! Atomic `Q(attribute, operator, argument)` predicates combined into
//! AND/OR groups, plus a parser for the textual `Q(...) & Q(...)` form.

pub mod query;
mod parser;

pub use parser::{parse, ParseError};
pub use query::*;
