//! Field projection
//!
//! Two modes, never mixed:
//!
//! - Inclusion (`{"Description": 1}`): listed paths plus `_id`
//! - Exclusion (`{"Sodium": 0}`): everything except listed paths
//!
//! `_id: 0` is allowed in both. Aggregation `$project` additionally accepts
//! computed fields, which imply inclusion mode.

use serde_json::{Map, Value};

use crate::aggregation::Expression;
use crate::document::{set_path, Document, ID_FIELD};

use super::errors::{QueryError, QueryResult};

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    All,
    Include,
    Exclude,
}

/// Tree of included paths, keyed by path segment
#[derive(Debug, Clone, Default, PartialEq)]
struct IncludeTree {
    children: Vec<(String, IncludeNode)>,
}

#[derive(Debug, Clone, PartialEq)]
enum IncludeNode {
    Whole,
    Nested(IncludeTree),
}

impl IncludeTree {
    fn add(&mut self, segments: &[&str]) {
        let Some((head, rest)) = segments.split_first() else {
            return;
        };
        let position = self.children.iter().position(|(k, _)| k == head);
        match (position, rest.is_empty()) {
            (Some(pos), true) => self.children[pos].1 = IncludeNode::Whole,
            (Some(pos), false) => {
                if let IncludeNode::Nested(tree) = &mut self.children[pos].1 {
                    tree.add(rest);
                }
            }
            (None, true) => self.children.push((head.to_string(), IncludeNode::Whole)),
            (None, false) => {
                let mut tree = IncludeTree::default();
                tree.add(rest);
                self.children.push((head.to_string(), IncludeNode::Nested(tree)));
            }
        }
    }

    fn get(&self, key: &str) -> Option<&IncludeNode> {
        self.children.iter().find(|(k, _)| k == key).map(|(_, n)| n)
    }

    fn project(&self, source: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in source {
            match self.get(key) {
                Some(IncludeNode::Whole) => {
                    out.insert(key.clone(), value.clone());
                }
                Some(IncludeNode::Nested(tree)) => {
                    if let Some(projected) = tree.project_value(value) {
                        out.insert(key.clone(), projected);
                    }
                }
                None => {}
            }
        }
        out
    }

    fn project_value(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Object(map) => Some(Value::Object(self.project(map))),
            Value::Array(items) => Some(Value::Array(
                items.iter().filter_map(|item| match item {
                    Value::Object(_) | Value::Array(_) => self.project_value(item),
                    _ => None,
                })
                .collect(),
            )),
            _ => None,
        }
    }
}

/// A parsed projection
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    mode: Mode,
    include_id: bool,
    included: IncludeTree,
    excluded: Vec<String>,
    computed: Vec<(String, Expression)>,
}

impl Projection {
    /// The identity projection
    pub fn all() -> Self {
        Self {
            mode: Mode::All,
            include_id: true,
            included: IncludeTree::default(),
            excluded: Vec::new(),
            computed: Vec::new(),
        }
    }

    /// Parses a `find` projection. Computed fields are rejected.
    pub fn parse(value: &Value) -> QueryResult<Self> {
        Self::parse_with(value, false)
    }

    /// Parses a `$project` stage, which may define computed fields
    pub fn parse_stage(value: &Value) -> QueryResult<Self> {
        let projection = Self::parse_with(value, true)?;
        if projection.mode == Mode::All {
            return Err(QueryError::validation("$project requires at least one field"));
        }
        Ok(projection)
    }

    fn parse_with(value: &Value, allow_computed: bool) -> QueryResult<Self> {
        let map = match value {
            Value::Null => return Ok(Self::all()),
            Value::Object(map) => map,
            other => {
                return Err(QueryError::validation(format!(
                    "projection must be an object, got {}",
                    other
                )))
            }
        };

        let mut projection = Self::all();
        let mut includes = false;
        let mut excludes = false;
        let mut id_requested = false;

        for (path, spec) in map {
            if path.is_empty() || path.starts_with('$') || path.split('.').any(str::is_empty) {
                return Err(QueryError::validation(format!(
                    "invalid projection field '{}'",
                    path
                )));
            }
            match flag(spec) {
                Some(included) if path == ID_FIELD => {
                    projection.include_id = included;
                    id_requested = included;
                }
                Some(true) => {
                    includes = true;
                    let segments: Vec<&str> = path.split('.').collect();
                    projection.included.add(&segments);
                }
                Some(false) => {
                    excludes = true;
                    projection.excluded.push(path.clone());
                }
                None if allow_computed => {
                    includes = true;
                    if path == ID_FIELD {
                        projection.include_id = false;
                    }
                    projection.computed.push((path.clone(), Expression::parse(spec)?));
                }
                None => {
                    return Err(QueryError::validation(format!(
                        "projection value for '{}' must be 0, 1, true or false, got {}",
                        path, spec
                    )))
                }
            }
        }

        if includes && excludes {
            return Err(QueryError::validation(
                "projection cannot mix inclusion and exclusion",
            ));
        }

        projection.mode = if includes {
            Mode::Include
        } else if excludes || !projection.include_id {
            Mode::Exclude
        } else if id_requested {
            Mode::Include
        } else {
            Mode::All
        };
        Ok(projection)
    }

    /// Returns true if this projection returns documents unchanged
    pub fn is_identity(&self) -> bool {
        self.mode == Mode::All
    }

    /// Applies the projection, evaluating computed fields
    pub fn apply(&self, doc: &Document) -> QueryResult<Document> {
        let mut out = self.apply_fields(doc);
        for (path, expr) in &self.computed {
            if let Some(value) = expr.evaluate(doc)? {
                if !set_path(&mut out, path, value) {
                    return Err(QueryError::validation(format!(
                        "cannot set computed field '{}'",
                        path
                    )));
                }
            }
        }
        Ok(out)
    }

    /// Applies the included and excluded paths only.
    ///
    /// `find` projections carry no computed fields, so this is their full
    /// effect.
    pub fn apply_fields(&self, doc: &Document) -> Document {
        match self.mode {
            Mode::All => doc.clone(),
            Mode::Include => {
                let mut tree = self.included.clone();
                if self.include_id {
                    tree.add(&[ID_FIELD]);
                }
                tree.project(doc)
            }
            Mode::Exclude => {
                let mut out = doc.clone();
                for path in &self.excluded {
                    let segments: Vec<&str> = path.split('.').collect();
                    exclude_path(&mut out, &segments);
                }
                if !self.include_id {
                    out.shift_remove(ID_FIELD);
                }
                out
            }
        }
    }
}

fn flag(spec: &Value) -> Option<bool> {
    match spec {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

fn exclude_path(map: &mut Map<String, Value>, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.shift_remove(*head);
        return;
    }
    match map.get_mut(*head) {
        Some(Value::Object(inner)) => exclude_path(inner, rest),
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::Object(inner) = item {
                    exclude_path(inner, rest);
                }
            }
        }
        _ => {}
    }
}
