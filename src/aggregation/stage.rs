//! Pipeline stage parsing
//!
//! Every stage is a single-key object. Stages are fully validated before
//! any of them runs.

use serde_json::Value;

use crate::executor::{Projection, QueryError, QueryResult, SortSpec};
use crate::filter::{parse_filter, Filter};

use super::accumulator::Accumulator;
use super::expression::Expression;

/// `$group` specification
#[derive(Debug, Clone)]
pub struct GroupSpec {
    /// Group key expression
    pub id: Expression,
    /// Output fields in declaration order
    pub fields: Vec<(String, Accumulator)>,
}

/// `$lookup` specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSpec {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

/// `$unwind` specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwindSpec {
    /// Field path without the leading `$`
    pub path: String,
    /// Keep documents whose array is missing, null or empty
    pub preserve_null_and_empty: bool,
    /// Field receiving the element index
    pub include_array_index: Option<String>,
}

/// One parsed pipeline stage
#[derive(Debug, Clone)]
pub enum Stage {
    Match(Filter),
    Project(Projection),
    Group(GroupSpec),
    Sort(SortSpec),
    Limit(u64),
    Skip(u64),
    Lookup(LookupSpec),
    Unwind(UnwindSpec),
    Count(String),
    IndexStats,
}

impl Stage {
    /// Stage name including the `$`
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Project(_) => "$project",
            Stage::Group(_) => "$group",
            Stage::Sort(_) => "$sort",
            Stage::Limit(_) => "$limit",
            Stage::Skip(_) => "$skip",
            Stage::Lookup(_) => "$lookup",
            Stage::Unwind(_) => "$unwind",
            Stage::Count(_) => "$count",
            Stage::IndexStats => "$indexStats",
        }
    }

    /// Parses one stage object
    pub fn parse(value: &Value) -> QueryResult<Self> {
        let entry = match value {
            Value::Object(map) if map.len() == 1 => map.iter().next(),
            _ => None,
        };
        let Some((name, spec)) = entry else {
            return Err(QueryError::validation(format!(
                "a pipeline stage must be an object with exactly one field, got {}",
                value
            )));
        };

        match name.as_str() {
            "$match" => Ok(Stage::Match(parse_filter(spec)?)),
            "$project" => Ok(Stage::Project(Projection::parse_stage(spec)?)),
            "$group" => parse_group(spec).map(Stage::Group),
            "$sort" => Ok(Stage::Sort(SortSpec::parse(spec)?)),
            "$limit" => match count_operand(name, spec)? {
                0 => Err(QueryError::validation("$limit must be positive")),
                n => Ok(Stage::Limit(n)),
            },
            "$skip" => count_operand(name, spec).map(Stage::Skip),
            "$lookup" => parse_lookup(spec).map(Stage::Lookup),
            "$unwind" => parse_unwind(spec).map(Stage::Unwind),
            "$count" => parse_count(spec).map(Stage::Count),
            "$indexStats" => match spec {
                Value::Object(map) if map.is_empty() => Ok(Stage::IndexStats),
                other => Err(QueryError::validation(format!(
                    "$indexStats takes an empty object, got {}",
                    other
                ))),
            },
            other => Err(QueryError::validation(format!(
                "unrecognized pipeline stage name: '{}'",
                other
            ))),
        }
    }
}

fn count_operand(name: &str, spec: &Value) -> QueryResult<u64> {
    match spec.as_u64() {
        Some(n) => Ok(n),
        None => match spec.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
            _ => Err(QueryError::validation(format!(
                "{} requires a non-negative integer, got {}",
                name, spec
            ))),
        },
    }
}

fn parse_group(spec: &Value) -> QueryResult<GroupSpec> {
    let Value::Object(map) = spec else {
        return Err(QueryError::validation(format!(
            "$group requires an object, got {}",
            spec
        )));
    };
    let Some(id) = map.get("_id") else {
        return Err(QueryError::validation("$group requires an _id field"));
    };

    let mut fields = Vec::with_capacity(map.len() - 1);
    for (field, value) in map.iter().filter(|(k, _)| k.as_str() != "_id") {
        if field.contains('.') || field.starts_with('$') {
            return Err(QueryError::validation(format!(
                "invalid $group output field '{}'",
                field
            )));
        }
        fields.push((field.clone(), Accumulator::parse(field, value)?));
    }

    Ok(GroupSpec {
        id: Expression::parse(id)?,
        fields,
    })
}

fn string_field(stage: &str, spec: &serde_json::Map<String, Value>, key: &str) -> QueryResult<String> {
    match spec.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(other) => Err(QueryError::validation(format!(
            "{} field '{}' must be a non-empty string, got {}",
            stage, key, other
        ))),
        None => Err(QueryError::validation(format!(
            "{} requires '{}'",
            stage, key
        ))),
    }
}

fn parse_lookup(spec: &Value) -> QueryResult<LookupSpec> {
    let Value::Object(map) = spec else {
        return Err(QueryError::validation(format!(
            "$lookup requires an object, got {}",
            spec
        )));
    };
    if let Some(unknown) = map
        .keys()
        .find(|k| !matches!(k.as_str(), "from" | "localField" | "foreignField" | "as"))
    {
        return Err(QueryError::validation(format!(
            "unknown $lookup field '{}'",
            unknown
        )));
    }

    Ok(LookupSpec {
        from: string_field("$lookup", map, "from")?,
        local_field: string_field("$lookup", map, "localField")?,
        foreign_field: string_field("$lookup", map, "foreignField")?,
        as_field: string_field("$lookup", map, "as")?,
    })
}

fn unwind_path(raw: &str) -> QueryResult<String> {
    match raw.strip_prefix('$') {
        Some(path) if !path.is_empty() && !path.starts_with('$') => Ok(path.to_string()),
        _ => Err(QueryError::validation(format!(
            "$unwind path must be a field path starting with '$', got '{}'",
            raw
        ))),
    }
}

fn parse_unwind(spec: &Value) -> QueryResult<UnwindSpec> {
    match spec {
        Value::String(path) => Ok(UnwindSpec {
            path: unwind_path(path)?,
            preserve_null_and_empty: false,
            include_array_index: None,
        }),
        Value::Object(map) => {
            let mut unwind = UnwindSpec {
                path: String::new(),
                preserve_null_and_empty: false,
                include_array_index: None,
            };
            for (key, value) in map {
                match (key.as_str(), value) {
                    ("path", Value::String(path)) => unwind.path = unwind_path(path)?,
                    ("preserveNullAndEmptyArrays", Value::Bool(b)) => {
                        unwind.preserve_null_and_empty = *b
                    }
                    ("includeArrayIndex", Value::String(field))
                        if !field.is_empty() && !field.starts_with('$') =>
                    {
                        unwind.include_array_index = Some(field.clone())
                    }
                    (key, value) => {
                        return Err(QueryError::validation(format!(
                            "invalid $unwind option {}: {}",
                            key, value
                        )))
                    }
                }
            }
            if unwind.path.is_empty() {
                return Err(QueryError::validation("$unwind requires a path"));
            }
            Ok(unwind)
        }
        other => Err(QueryError::validation(format!(
            "$unwind requires a string or an object, got {}",
            other
        ))),
    }
}

fn parse_count(spec: &Value) -> QueryResult<String> {
    match spec {
        Value::String(name) if !name.is_empty() && !name.starts_with('$') && !name.contains('.') => {
            Ok(name.clone())
        }
        other => Err(QueryError::validation(format!(
            "$count requires a plain field name, got {}",
            other
        ))),
    }
}
