//! Reduce functions

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::numeric_input;
use crate::document::{compare_values, Numeric};
use crate::executor::QueryResult;

/// Named reducers usable from declarative commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinReducer {
    Sum,
    Count,
    Max,
    Min,
}

type CustomReducer = Box<dyn Fn(&Value, &[Value]) -> QueryResult<Value>>;

/// Reduce function. Must be associative and commutative.
pub enum ReduceFn {
    /// Numeric sum; nulls are skipped, other non-numbers are a type mismatch
    Sum,
    /// Number of emitted values
    Count,
    /// Largest value by collation, ignoring nulls
    Max,
    /// Smallest value by collation, ignoring nulls
    Min,
    /// `reduce(key, values)`; not called for keys with a single value
    Custom(CustomReducer),
}

impl ReduceFn {
    /// Wraps a closure
    pub fn custom(f: impl Fn(&Value, &[Value]) -> QueryResult<Value> + 'static) -> Self {
        ReduceFn::Custom(Box::new(f))
    }

    /// Folds all values emitted for `key`
    pub fn reduce(&self, key: &Value, values: Vec<Value>) -> QueryResult<Value> {
        match self {
            ReduceFn::Sum => {
                let mut total = Numeric::Int(0);
                for value in values {
                    if let Some(n) = numeric_input("sum reducer", &Some(value))? {
                        total = total.add(n);
                    }
                }
                Ok(total.to_value())
            }
            ReduceFn::Count => Ok(Value::from(values.len() as u64)),
            ReduceFn::Max => Ok(extreme(values, Ordering::Greater)),
            ReduceFn::Min => Ok(extreme(values, Ordering::Less)),
            ReduceFn::Custom(f) => {
                if values.len() == 1 {
                    return Ok(values.into_iter().next().unwrap_or(Value::Null));
                }
                f(key, &values)
            }
        }
    }
}

fn extreme(values: Vec<Value>, keep: Ordering) -> Value {
    values
        .into_iter()
        .filter(|v| !v.is_null())
        .reduce(|best, v| if compare_values(&v, &best) == keep { v } else { best })
        .unwrap_or(Value::Null)
}

impl From<BuiltinReducer> for ReduceFn {
    fn from(reducer: BuiltinReducer) -> Self {
        match reducer {
            BuiltinReducer::Sum => ReduceFn::Sum,
            BuiltinReducer::Count => ReduceFn::Count,
            BuiltinReducer::Max => ReduceFn::Max,
            BuiltinReducer::Min => ReduceFn::Min,
        }
    }
}

impl std::fmt::Debug for ReduceFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceFn::Sum => f.write_str("Sum"),
            ReduceFn::Count => f.write_str("Count"),
            ReduceFn::Max => f.write_str("Max"),
            ReduceFn::Min => f.write_str("Min"),
            ReduceFn::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
