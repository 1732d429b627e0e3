//! Dotted field paths
//!
//! `p.Protein` addresses the `Protein` field of the `p` sub-document. When a
//! segment lands on an array, the remaining path is applied to every element,
//! which is how a looked-up array of documents is queried.

use serde_json::{Map, Value};

use super::Document;

/// Resolves every value addressed by `path`.
///
/// Arrays met before the last segment are traversed element by element. A
/// numeric segment also indexes into an array.
pub fn resolve<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    walk_map(doc, &segments, &mut out);
    out
}

/// Like `resolve`, but array values are also expanded into their elements.
///
/// Both the array itself and each element are returned so that equality
/// against a whole array and against one element both succeed.
pub fn resolve_flat<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    for value in resolve(doc, path) {
        out.push(value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

fn walk_map<'a>(map: &'a Map<String, Value>, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = map.get(*head) else {
        return;
    };
    if rest.is_empty() {
        out.push(value);
    } else {
        walk_value(value, rest, out);
    }
}

fn walk_value<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => walk_map(map, segments, out),
        Value::Array(items) => {
            if let Ok(position) = segments[0].parse::<usize>() {
                if let Some(item) = items.get(position) {
                    if segments.len() == 1 {
                        out.push(item);
                    } else {
                        walk_value(item, &segments[1..], out);
                    }
                }
                return;
            }
            for item in items {
                if let Value::Object(map) = item {
                    walk_map(map, segments, out);
                }
            }
        }
        _ => {}
    }
}

/// Reads the value at `path` the way an aggregation field reference does.
///
/// Traversing an array yields an array of the values found in its elements.
/// Returns None when nothing is addressed.
pub fn lookup_value(doc: &Document, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    lookup_in_map(doc, &segments)
}

fn lookup_in_map(map: &Map<String, Value>, segments: &[&str]) -> Option<Value> {
    let (head, rest) = segments.split_first()?;
    let value = map.get(*head)?;
    if rest.is_empty() {
        return Some(value.clone());
    }
    lookup_in_value(value, rest)
}

fn lookup_in_value(value: &Value, segments: &[&str]) -> Option<Value> {
    match value {
        Value::Object(map) => lookup_in_map(map, segments),
        Value::Array(items) => {
            let found: Vec<Value> = items
                .iter()
                .filter_map(|item| lookup_in_value(item, segments))
                .collect();
            Some(Value::Array(found))
        }
        _ => None,
    }
}

/// Reads the value at `path`, descending through nested objects only.
///
/// Returns None when the path is absent or crosses an array or a scalar.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        None => doc.get(path),
        Some((head, rest)) => match doc.get(head) {
            Some(Value::Object(map)) => get_path(map, rest),
            _ => None,
        },
    }
}

/// Writes `value` at `path`, replacing any intermediate that is not an object.
pub fn overwrite_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(map) = entry {
                overwrite_path(map, rest, value);
            }
        }
    }
}

/// Writes `value` at `path`, creating intermediate objects.
///
/// Returns false when an intermediate segment exists and is not an object;
/// the document is left untouched in that case.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    if !path_is_settable(doc, &segments) {
        return false;
    }

    let mut current = doc;
    for segment in &segments[..segments.len() - 1] {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(map) => current = map,
            _ => return false,
        }
    }
    current.insert(segments[segments.len() - 1].to_string(), value);
    true
}

fn path_is_settable(doc: &Document, segments: &[&str]) -> bool {
    let mut current = doc;
    for segment in &segments[..segments.len().saturating_sub(1)] {
        match current.get(*segment) {
            None => return true,
            Some(Value::Object(map)) => current = map,
            Some(_) => return false,
        }
    }
    true
}

/// Removes the value at `path`, descending through nested objects only.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.shift_remove(path),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Value::Object(map)) => remove_path(map, rest),
            _ => None,
        },
    }
}
