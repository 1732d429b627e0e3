//! Index key specifications and options

use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::Document;
use crate::executor::{QueryError, QueryResult};

/// Direction of one indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Asc,
    Desc,
}

impl IndexDirection {
    /// Returns 1 or -1
    pub fn as_i64(&self) -> i64 {
        match self {
            IndexDirection::Asc => 1,
            IndexDirection::Desc => -1,
        }
    }
}

/// Ordered list of indexed fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    fields: Vec<(String, IndexDirection)>,
}

impl IndexSpec {
    /// Parses `{field: 1 | -1, ...}`.
    pub fn parse(value: &Value) -> QueryResult<Self> {
        let Value::Object(map) = value else {
            return Err(QueryError::validation(format!(
                "index key spec must be an object, got {}",
                value
            )));
        };
        if map.is_empty() {
            return Err(QueryError::validation("index key spec cannot be empty"));
        }

        let mut fields = Vec::with_capacity(map.len());
        for (field, direction) in map {
            if field.is_empty() || field.starts_with('$') {
                return Err(QueryError::validation(format!(
                    "invalid index field name '{}'",
                    field
                )));
            }
            let direction = match direction.as_f64() {
                Some(d) if d == 1.0 => IndexDirection::Asc,
                Some(d) if d == -1.0 => IndexDirection::Desc,
                _ => {
                    return Err(QueryError::validation(format!(
                        "index direction for '{}' must be 1 or -1, got {}",
                        field, direction
                    )))
                }
            };
            fields.push((field.clone(), direction));
        }

        Ok(Self { fields })
    }

    /// Single ascending field
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            fields: vec![(field.into(), IndexDirection::Asc)],
        }
    }

    /// Appends a field
    pub fn then(mut self, field: impl Into<String>, direction: IndexDirection) -> Self {
        self.fields.push((field.into(), direction));
        self
    }

    /// Indexed fields in order
    pub fn fields(&self) -> &[(String, IndexDirection)] {
        &self.fields
    }

    /// Name of the first field
    pub fn first_field(&self) -> &str {
        &self.fields[0].0
    }

    /// Generated index name, e.g. `ID_1_Description_1`
    pub fn default_name(&self) -> String {
        self.fields
            .iter()
            .map(|(f, d)| format!("{}_{}", f, d.as_i64()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Key spec as a document
    pub fn to_document(&self) -> Document {
        self.fields
            .iter()
            .map(|(f, d)| (f.clone(), Value::from(d.as_i64())))
            .collect()
    }
}

/// Options accepted by index creation and removal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexOptions {
    /// Explicit index name
    pub name: Option<String>,
    /// Reject documents with duplicate keys
    pub unique: bool,
    /// Collation document; stored and reported, not applied
    pub collation: Option<Document>,
}

impl IndexOptions {
    /// Parses `{name?, unique?, collation?}`. `null` means defaults.
    pub fn parse(value: &Value) -> QueryResult<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(QueryError::validation(format!(
                    "index options must be an object, got {}",
                    other
                )))
            }
        };

        let mut options = Self::default();
        for (key, value) in map {
            match (key.as_str(), value) {
                ("name", Value::String(name)) if !name.is_empty() => {
                    options.name = Some(name.clone())
                }
                ("unique", Value::Bool(unique)) => options.unique = *unique,
                ("collation", Value::Object(collation)) => {
                    if !matches!(collation.get("locale"), Some(Value::String(_))) {
                        return Err(QueryError::validation(
                            "collation requires a string locale",
                        ));
                    }
                    options.collation = Some(collation.clone());
                }
                (key, value) => {
                    return Err(QueryError::validation(format!(
                        "invalid index option {}: {}",
                        key, value
                    )))
                }
            }
        }

        Ok(options)
    }

    /// Sets the unique flag
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the collation locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        let mut collation = Map::new();
        collation.insert("locale".to_string(), Value::String(locale.into()));
        self.collation = Some(collation);
        self
    }

    /// Collation locale, if any
    pub fn locale(&self) -> Option<&str> {
        self.collation
            .as_ref()
            .and_then(|c| c.get("locale"))
            .and_then(Value::as_str)
    }
}

/// Index description as returned by `list_indexes`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDescription {
    /// Index format version
    pub v: u32,
    /// Key spec
    pub key: Document,
    /// Index name
    pub name: String,
    /// Present only for unique indexes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    /// Present only when a collation was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<Document>,
}
