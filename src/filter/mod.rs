//! Filter language
//!
//! A filter is a JSON object mapping field paths to literals (equality) or
//! operator objects, combined with `$and`, `$or` and `$nor`:
//!
//! ```text
//! {"WWEIA Category code": 2202,
//!  "$or": [{"Food code": 24100010}, {"Food code": 24100020}]}
//!
//! {"Sodium": {"$gt": 10000}}
//!
//! {"Description": {"$regex": "^CHEESE"}}
//! ```
//!
//! Filters are validated once by the parser and then evaluated against any
//! number of documents. Malformed input is rejected, never coerced.

mod ast;
mod eval;
mod parser;

pub use ast::{Condition, Filter};
pub use parser::{parse_filter, parse_filter_str};
