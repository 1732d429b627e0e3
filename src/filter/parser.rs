//! Filter parsing and validation
//!
//! Converts a JSON filter into a `Filter` tree. Every structural problem is a
//! validation error: unknown operators, empty logical arrays, uncompilable
//! patterns, and filter text that is not valid JSON at all.

use regex::RegexBuilder;
use serde_json::{Map, Value};

use crate::executor::{QueryError, QueryResult};

use super::ast::{Condition, Filter};

/// Parses a filter from a JSON value.
///
/// `null` is accepted as the empty filter.
pub fn parse_filter(value: &Value) -> QueryResult<Filter> {
    match value {
        Value::Null => Ok(Filter::all()),
        Value::Object(map) => parse_object(map),
        other => Err(QueryError::validation(format!(
            "filter must be an object, got {}",
            other
        ))),
    }
}

/// Parses a filter from JSON text.
pub fn parse_filter_str(text: &str) -> QueryResult<Filter> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| QueryError::validation(format!("malformed filter: {}", e)))?;
    parse_filter(&value)
}

fn parse_object(map: &Map<String, Value>) -> QueryResult<Filter> {
    let mut clauses = Vec::with_capacity(map.len());

    for (key, value) in map {
        if let Some(op) = key.strip_prefix('$') {
            clauses.push(parse_logical(op, value)?);
        } else {
            if key.is_empty() {
                return Err(QueryError::validation("filter field name cannot be empty"));
            }
            clauses.push(Filter::Field {
                path: key.clone(),
                conditions: parse_conditions(key, value)?,
            });
        }
    }

    if clauses.len() == 1 {
        if let Some(only) = clauses.pop() {
            return Ok(only);
        }
    }
    Ok(Filter::And(clauses))
}

fn parse_logical(op: &str, value: &Value) -> QueryResult<Filter> {
    let build: fn(Vec<Filter>) -> Filter = match op {
        "and" => Filter::And,
        "or" => Filter::Or,
        "nor" => Filter::Nor,
        _ => {
            return Err(QueryError::validation(format!(
                "unknown top-level operator: ${}",
                op
            )))
        }
    };

    let Value::Array(items) = value else {
        return Err(QueryError::validation(format!("${} must be an array", op)));
    };
    if items.is_empty() {
        return Err(QueryError::validation(format!(
            "${} must be a non-empty array",
            op
        )));
    }

    let children = items
        .iter()
        .map(|item| match item {
            Value::Object(map) => parse_object(map),
            other => Err(QueryError::validation(format!(
                "${} entries must be objects, got {}",
                op, other
            ))),
        })
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(build(children))
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    map.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn parse_conditions(path: &str, value: &Value) -> QueryResult<Vec<Condition>> {
    let Value::Object(ops) = value else {
        return Ok(vec![Condition::Eq(value.clone())]);
    };
    if !is_operator_object(ops) {
        if ops.keys().any(|k| k.starts_with('$')) {
            return Err(QueryError::validation(format!(
                "field '{}' mixes operators and plain fields",
                path
            )));
        }
        return Ok(vec![Condition::Eq(value.clone())]);
    }

    let options = match ops.get("$options") {
        None => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            return Err(QueryError::validation(format!(
                "$options must be a string, got {}",
                other
            )))
        }
    };
    if options.is_some() && !ops.contains_key("$regex") {
        return Err(QueryError::validation("$options requires $regex"));
    }

    let mut conditions = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let condition = match op.as_str() {
            "$eq" => Condition::Eq(operand.clone()),
            "$ne" => Condition::Ne(operand.clone()),
            "$gt" => Condition::Gt(operand.clone()),
            "$gte" => Condition::Gte(operand.clone()),
            "$lt" => Condition::Lt(operand.clone()),
            "$lte" => Condition::Lte(operand.clone()),
            "$in" => Condition::In(expect_array(op, operand)?),
            "$nin" => Condition::Nin(expect_array(op, operand)?),
            "$exists" => Condition::Exists(truthy(op, operand)?),
            "$regex" => Condition::Regex(compile_regex(operand, options)?),
            "$options" => continue,
            other if other.starts_with('$') => {
                return Err(QueryError::validation(format!(
                    "unknown operator {} on field '{}'",
                    other, path
                )))
            }
            other => {
                return Err(QueryError::validation(format!(
                    "field '{}' mixes operators and plain field '{}'",
                    path, other
                )))
            }
        };
        conditions.push(condition);
    }

    Ok(conditions)
}

fn expect_array(op: &str, operand: &Value) -> QueryResult<Vec<Value>> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        other => Err(QueryError::validation(format!(
            "{} requires an array, got {}",
            op, other
        ))),
    }
}

fn truthy(op: &str, operand: &Value) -> QueryResult<bool> {
    match operand {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        other => Err(QueryError::validation(format!(
            "{} requires a boolean, got {}",
            op, other
        ))),
    }
}

fn compile_regex(operand: &Value, options: Option<&str>) -> QueryResult<regex::Regex> {
    let Value::String(pattern) = operand else {
        return Err(QueryError::validation(format!(
            "$regex requires a string pattern, got {}",
            operand
        )));
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in options.unwrap_or_default().chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(QueryError::validation(format!(
                    "unsupported $options flag '{}'",
                    other
                )))
            }
        };
    }

    builder
        .build()
        .map_err(|e| QueryError::validation(format!("invalid $regex '{}': {}", pattern, e)))
}
