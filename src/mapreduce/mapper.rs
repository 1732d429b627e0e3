//! Map functions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::Expression;
use crate::document::Document;
use crate::executor::QueryResult;

/// Collects the pairs emitted for one document
#[derive(Debug, Default)]
pub struct Emitter {
    pairs: Vec<(Value, Value)>,
}

impl Emitter {
    /// Creates an empty emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits one pair
    pub fn emit(&mut self, key: Value, value: Value) {
        self.pairs.push((key, value));
    }

    /// Number of pairs emitted so far
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub(crate) fn into_pairs(self) -> Vec<(Value, Value)> {
        self.pairs
    }
}

/// Declarative mapper: one pair per document, both sides expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitSpec {
    /// Key expression, e.g. `"$ID"`
    pub key: Value,
    /// Value expression, e.g. `"$Iron"`
    pub value: Value,
}

type CustomMapper = Box<dyn Fn(&Document, &mut Emitter) -> QueryResult<()>>;

/// Map function
pub enum MapFn {
    /// Compiled `EmitSpec`; missing key or value emits null
    Emit {
        key: Expression,
        value: Expression,
    },
    /// Arbitrary mapper
    Custom(CustomMapper),
}

impl MapFn {
    /// Compiles `emit(key, value)` from two expressions
    pub fn emit(key: impl Into<Value>, value: impl Into<Value>) -> QueryResult<Self> {
        Self::from_spec(&EmitSpec {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Compiles an `EmitSpec`
    pub fn from_spec(spec: &EmitSpec) -> QueryResult<Self> {
        Ok(MapFn::Emit {
            key: Expression::parse(&spec.key)?,
            value: Expression::parse(&spec.value)?,
        })
    }

    /// Wraps a closure
    pub fn custom(f: impl Fn(&Document, &mut Emitter) -> QueryResult<()> + 'static) -> Self {
        MapFn::Custom(Box::new(f))
    }

    /// Runs the mapper over one document
    pub fn map(&self, doc: &Document, emitter: &mut Emitter) -> QueryResult<()> {
        match self {
            MapFn::Emit { key, value } => {
                emitter.emit(key.evaluate_or_null(doc)?, value.evaluate_or_null(doc)?);
                Ok(())
            }
            MapFn::Custom(f) => f(doc, emitter),
        }
    }
}

impl std::fmt::Debug for MapFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapFn::Emit { key, value } => f
                .debug_struct("Emit")
                .field("key", key)
                .field("value", value)
                .finish(),
            MapFn::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
