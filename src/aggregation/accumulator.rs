//! `$group` accumulators

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::{compare_values, Document, Numeric};
use crate::executor::{QueryError, QueryResult};

use super::expression::Expression;

/// Accumulator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorOp {
    Sum,
    Avg,
    Max,
    Min,
    First,
    Last,
    Push,
    Count,
}

impl AccumulatorOp {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "$sum" => AccumulatorOp::Sum,
            "$avg" => AccumulatorOp::Avg,
            "$max" => AccumulatorOp::Max,
            "$min" => AccumulatorOp::Min,
            "$first" => AccumulatorOp::First,
            "$last" => AccumulatorOp::Last,
            "$push" => AccumulatorOp::Push,
            "$count" => AccumulatorOp::Count,
            _ => return None,
        })
    }
}

/// One output field of a `$group` stage
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    op: AccumulatorOp,
    expr: Expression,
}

impl Accumulator {
    /// Parses `{"$op": expr}`
    pub fn parse(field: &str, value: &Value) -> QueryResult<Self> {
        let spec = match value {
            Value::Object(map) if map.len() == 1 => map.iter().next(),
            _ => None,
        };
        let Some((name, operand)) = spec else {
            return Err(QueryError::validation(format!(
                "group field '{}' must be an accumulator object, got {}",
                field, value
            )));
        };
        let Some(op) = AccumulatorOp::from_name(name) else {
            return Err(QueryError::validation(format!(
                "unknown group accumulator '{}' for field '{}'",
                name, field
            )));
        };

        let expr = if op == AccumulatorOp::Count {
            if !matches!(operand, Value::Object(m) if m.is_empty()) {
                return Err(QueryError::validation("$count accumulator takes {}"));
            }
            Expression::Literal(Value::Null)
        } else {
            Expression::parse(operand)?
        };

        Ok(Self { op, expr })
    }

    /// Fresh state for a new group
    pub fn start(&self) -> AccumulatorState {
        match self.op {
            AccumulatorOp::Sum => AccumulatorState::Sum(Numeric::Int(0)),
            AccumulatorOp::Avg => AccumulatorState::Avg {
                total: Numeric::Int(0),
                count: 0,
            },
            AccumulatorOp::Max => AccumulatorState::Extreme(Ordering::Greater, None),
            AccumulatorOp::Min => AccumulatorState::Extreme(Ordering::Less, None),
            AccumulatorOp::First => AccumulatorState::First(None),
            AccumulatorOp::Last => AccumulatorState::Last(Value::Null),
            AccumulatorOp::Push => AccumulatorState::Push(Vec::new()),
            AccumulatorOp::Count => AccumulatorState::Count(0),
        }
    }

    /// Feeds one document into `state`
    pub fn accumulate(&self, state: &mut AccumulatorState, doc: &Document) -> QueryResult<()> {
        let value = self.expr.evaluate(doc)?;
        state.add(value)
    }
}

/// Running value of one accumulator within one group
#[derive(Debug, Clone, PartialEq)]
pub enum AccumulatorState {
    Sum(Numeric),
    Avg { total: Numeric, count: u64 },
    /// Keeps the value that compares as the given ordering against the rest
    Extreme(Ordering, Option<Value>),
    First(Option<Value>),
    Last(Value),
    Push(Vec<Value>),
    Count(u64),
}

impl AccumulatorState {
    fn add(&mut self, value: Option<Value>) -> QueryResult<()> {
        match self {
            AccumulatorState::Sum(total) => {
                if let Some(n) = numeric_input("$sum", &value)? {
                    *total = total.add(n);
                }
            }
            AccumulatorState::Avg { total, count } => {
                if let Some(n) = numeric_input("$avg", &value)? {
                    *total = total.add(n);
                    *count += 1;
                }
            }
            AccumulatorState::Extreme(keep, current) => match value {
                None | Some(Value::Null) => {}
                Some(v) => {
                    let replace = match current {
                        None => true,
                        Some(c) => compare_values(&v, c) == *keep,
                    };
                    if replace {
                        *current = Some(v);
                    }
                }
            },
            AccumulatorState::First(first) => {
                if first.is_none() {
                    *first = Some(value.unwrap_or(Value::Null));
                }
            }
            AccumulatorState::Last(last) => *last = value.unwrap_or(Value::Null),
            AccumulatorState::Push(items) => {
                if let Some(v) = value {
                    items.push(v);
                }
            }
            AccumulatorState::Count(count) => *count += 1,
        }
        Ok(())
    }

    /// Final value of the accumulator
    pub fn finish(self) -> Value {
        match self {
            AccumulatorState::Sum(total) => total.to_value(),
            AccumulatorState::Avg { total, count } => {
                if count == 0 {
                    Value::Null
                } else {
                    Numeric::Float(total.as_f64() / count as f64).to_value()
                }
            }
            AccumulatorState::Extreme(_, value) => value.unwrap_or(Value::Null),
            AccumulatorState::First(value) => value.unwrap_or(Value::Null),
            AccumulatorState::Last(value) => value,
            AccumulatorState::Push(items) => Value::Array(items),
            AccumulatorState::Count(count) => Value::from(count),
        }
    }
}

/// Null and missing are skipped; any other non-number is a type mismatch.
pub(crate) fn numeric_input(op: &str, value: &Option<Value>) -> QueryResult<Option<Numeric>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Numeric::from_value(v).map(Some).ok_or_else(|| {
            QueryError::type_mismatch(format!("{} requires numeric values, got {}", op, v))
        }),
    }
}
