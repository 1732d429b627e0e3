//! Result sorting for query execution
//!
//! Sorts by an ordered list of field paths using the value collation order.
//! The sort is stable: ties keep their input order.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::{compare_values, resolve, Document};

use super::errors::{QueryError, QueryResult};

/// Sort direction for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordered sort keys, e.g. `{"Calories": -1, "ID": 1}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<(String, SortDirection)>,
}

impl SortSpec {
    /// Parses a sort object; values must be 1 or -1
    pub fn parse(value: &Value) -> QueryResult<Self> {
        let Value::Object(map) = value else {
            return Err(QueryError::validation(format!(
                "sort must be an object, got {}",
                value
            )));
        };
        if map.is_empty() {
            return Err(QueryError::validation("sort must name at least one field"));
        }

        let keys = map
            .iter()
            .map(|(field, direction)| {
                let direction = match direction.as_f64() {
                    Some(d) if d == 1.0 => SortDirection::Asc,
                    Some(d) if d == -1.0 => SortDirection::Desc,
                    _ => {
                        return Err(QueryError::validation(format!(
                            "sort direction for '{}' must be 1 or -1, got {}",
                            field, direction
                        )))
                    }
                };
                Ok((field.clone(), direction))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Self { keys })
    }

    /// Single ascending key
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortDirection::Asc)],
        }
    }

    /// Single descending key
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), SortDirection::Desc)],
        }
    }

    /// Sorts documents. Stable.
    pub fn sort(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut decorated: Vec<(Vec<Value>, Document)> = documents
            .into_iter()
            .map(|doc| (self.sort_keys(&doc), doc))
            .collect();

        decorated.sort_by(|(a, _), (b, _)| self.compare_keys(a, b));
        decorated.into_iter().map(|(_, doc)| doc).collect()
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for ((_, direction), (a_val, b_val)) in self.keys.iter().zip(a.iter().zip(b.iter())) {
            let ordering = compare_values(a_val, b_val);
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn sort_keys(&self, doc: &Document) -> Vec<Value> {
        self.keys
            .iter()
            .map(|(path, direction)| sort_key(doc, path, *direction))
            .collect()
    }
}

/// Sort key of one path.
///
/// Arrays contribute their elements; ascending sorts use the smallest value
/// and descending sorts the largest. Missing sorts as null.
fn sort_key(doc: &Document, path: &str, direction: SortDirection) -> Value {
    let mut candidates: Vec<&Value> = Vec::new();
    for value in resolve(doc, path) {
        match value {
            Value::Array(items) if !items.is_empty() => candidates.extend(items.iter()),
            other => candidates.push(other),
        }
    }

    let chosen = match direction {
        SortDirection::Asc => candidates.into_iter().min_by(|a, b| compare_values(a, b)),
        SortDirection::Desc => candidates.into_iter().max_by(|a, b| compare_values(a, b)),
    };
    chosen.cloned().unwrap_or(Value::Null)
}
