//! Update operators
//!
//! - `$set: {path: value}` replaces or creates a field
//! - `$inc: {path: number}` adds to a numeric field, absent counts as 0
//! - `$unset: {path: ""}` removes a field
//!
//! An update computes the full new document from the old one; nothing is
//! written until the caller commits the result.

use serde_json::{Map, Value};

use crate::document::{remove_path, set_path, Document, Numeric, ID_FIELD};

use super::errors::{QueryError, QueryResult};

#[derive(Debug, Clone, PartialEq)]
enum UpdateOp {
    Set(String, Value),
    Inc(String, Numeric),
    Unset(String),
}

impl UpdateOp {
    fn path(&self) -> &str {
        match self {
            UpdateOp::Set(p, _) | UpdateOp::Inc(p, _) | UpdateOp::Unset(p) => p,
        }
    }
}

/// A validated update document
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    ops: Vec<UpdateOp>,
}

impl UpdateSpec {
    /// Parses `{"$set": {...}, "$inc": {...}, "$unset": {...}}`
    pub fn parse(value: &Value) -> QueryResult<Self> {
        let Value::Object(map) = value else {
            return Err(QueryError::validation(format!(
                "update must be an object, got {}",
                value
            )));
        };
        if map.is_empty() {
            return Err(QueryError::validation("update requires at least one operator"));
        }

        let mut ops = Vec::new();
        for (operator, fields) in map {
            let Value::Object(fields) = fields else {
                return Err(QueryError::validation(format!(
                    "{} requires an object, got {}",
                    operator, fields
                )));
            };
            match operator.as_str() {
                "$set" => collect(&mut ops, fields, |path, v| Ok(UpdateOp::Set(path, v.clone())))?,
                "$inc" => collect(&mut ops, fields, |path, v| {
                    Numeric::from_value(v)
                        .map(|n| UpdateOp::Inc(path.clone(), n))
                        .ok_or_else(|| {
                            QueryError::validation(format!(
                                "$inc of '{}' requires a number, got {}",
                                path, v
                            ))
                        })
                })?,
                "$unset" => collect(&mut ops, fields, |path, _| Ok(UpdateOp::Unset(path)))?,
                other if other.starts_with('$') => {
                    return Err(QueryError::validation(format!(
                        "unknown update operator: {}",
                        other
                    )))
                }
                other => {
                    return Err(QueryError::validation(format!(
                        "update field '{}' is not an operator; replacement updates are not supported",
                        other
                    )))
                }
            }
        }

        check_paths(&ops)?;
        Ok(Self { ops })
    }

    /// Computes the updated document.
    ///
    /// Returns None when the update leaves the document unchanged.
    pub fn apply(&self, doc: &Document) -> QueryResult<Option<Document>> {
        let mut updated = doc.clone();

        for op in &self.ops {
            match op {
                UpdateOp::Set(path, value) => write(&mut updated, path, value.clone())?,
                UpdateOp::Inc(path, amount) => {
                    let current = match get_path(&updated, path) {
                        None | Some(Value::Null) => Numeric::Int(0),
                        Some(v) => Numeric::from_value(v).ok_or_else(|| {
                            QueryError::type_mismatch(format!(
                                "cannot apply $inc to non-numeric field '{}' holding {}",
                                path, v
                            ))
                        })?,
                    };
                    write(&mut updated, path, current.add(*amount).to_value())?;
                }
                UpdateOp::Unset(path) => {
                    remove_path(&mut updated, path);
                }
            }
        }

        Ok((updated != *doc).then_some(updated))
    }
}

fn collect(
    ops: &mut Vec<UpdateOp>,
    fields: &Map<String, Value>,
    build: impl Fn(String, &Value) -> QueryResult<UpdateOp>,
) -> QueryResult<()> {
    for (path, value) in fields {
        if path.is_empty() || path.split('.').any(|s| s.is_empty() || s.starts_with('$')) {
            return Err(QueryError::validation(format!("invalid update path '{}'", path)));
        }
        if path == ID_FIELD || path.starts_with("_id.") {
            return Err(QueryError::validation("_id is immutable"));
        }
        ops.push(build(path.clone(), value)?);
    }
    Ok(())
}

/// Two operators may not touch the same path or a path and its prefix
fn check_paths(ops: &[UpdateOp]) -> QueryResult<()> {
    for (i, a) in ops.iter().enumerate() {
        for b in &ops[i + 1..] {
            let (a, b) = (a.path(), b.path());
            let overlaps = a == b
                || b.strip_prefix(a).is_some_and(|r| r.starts_with('.'))
                || a.strip_prefix(b).is_some_and(|r| r.starts_with('.'));
            if overlaps {
                return Err(QueryError::validation(format!(
                    "updating '{}' conflicts with updating '{}'",
                    a, b
                )));
            }
        }
    }
    Ok(())
}

fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn write(doc: &mut Document, path: &str, value: Value) -> QueryResult<()> {
    if set_path(doc, path, value) {
        Ok(())
    } else {
        Err(QueryError::type_mismatch(format!(
            "cannot create field '{}': a parent is not an object",
            path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::into_document;
    use crate::executor::QueryErrorCode;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    #[test]
    fn test_set_and_inc() {
        let update = UpdateSpec::parse(&json!({
            "$set": {"Description": "Updated Food"},
            "$inc": {"Calories": 10}
        }))
        .unwrap();

        let out = update
            .apply(&doc(json!({"_id": 1, "Description": "Sample Food", "Calories": 90})))
            .unwrap()
            .unwrap();
        assert_eq!(out["Description"], json!("Updated Food"));
        assert_eq!(out["Calories"], json!(100));
    }

    #[test]
    fn test_inc_absent_field_starts_at_zero() {
        let update = UpdateSpec::parse(&json!({"$inc": {"Iron": 1.5}})).unwrap();
        let out = update.apply(&doc(json!({"_id": 1}))).unwrap().unwrap();
        assert_eq!(out["Iron"], json!(1.5));
    }

    #[test]
    fn test_inc_non_numeric_field() {
        let update = UpdateSpec::parse(&json!({"$inc": {"Iron": 1}})).unwrap();
        let err = update.apply(&doc(json!({"_id": 1, "Iron": "high"}))).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::TypeMismatch);
    }

    #[test]
    fn test_nested_set_and_unset() {
        let update = UpdateSpec::parse(&json!({
            "$set": {"portion.unit": "cup"},
            "$unset": {"Sodium": ""}
        }))
        .unwrap();
        let out = update.apply(&doc(json!({"_id": 1, "Sodium": 5}))).unwrap().unwrap();
        assert_eq!(Value::Object(out), json!({"_id": 1, "portion": {"unit": "cup"}}));
    }

    #[test]
    fn test_unchanged_document_reports_none() {
        let update = UpdateSpec::parse(&json!({"$set": {"Calories": 90}})).unwrap();
        assert!(update.apply(&doc(json!({"_id": 1, "Calories": 90}))).unwrap().is_none());
    }

    #[test]
    fn test_invalid_updates() {
        assert!(UpdateSpec::parse(&json!({})).unwrap_err().is_validation());
        assert!(UpdateSpec::parse(&json!({"Calories": 5})).unwrap_err().is_validation());
        assert!(UpdateSpec::parse(&json!({"$push": {"a": 1}})).unwrap_err().is_validation());
        assert!(UpdateSpec::parse(&json!({"$inc": {"a": "1"}})).unwrap_err().is_validation());
        assert!(UpdateSpec::parse(&json!({"$set": {"_id": 2}})).unwrap_err().is_validation());
        assert!(UpdateSpec::parse(&json!({"$set": {"a": 1}, "$inc": {"a": 1}}))
            .unwrap_err()
            .is_validation());
        assert!(UpdateSpec::parse(&json!({"$set": {"a": 1}, "$unset": {"a.b": ""}}))
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let update = UpdateSpec::parse(&json!({"$set": {"Sodium.unit": "mg"}})).unwrap();
        let err = update.apply(&doc(json!({"_id": 1, "Sodium": 5}))).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::TypeMismatch);
    }
}
