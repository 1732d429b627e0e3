//! Schema-less document model
//!
//! Documents are ordered maps from field name to a tagged JSON value. No two
//! documents in a collection are required to share fields, so every accessor
//! in this module treats an absent field as a normal outcome.
//!
//! # Ordering
//!
//! Values of different types compare by type rank first:
//!
//! ```text
//! null < number < string < object < array < bool
//! ```
//!
//! Numbers compare numerically regardless of integer or float encoding.

mod compare;
mod number;
mod path;

use serde_json::{Map, Value};

pub use compare::{canonical_key, compare_values, type_rank, values_equal};
pub use number::Numeric;
pub use path::{
    get_path, lookup_value, overwrite_path, remove_path, resolve, resolve_flat, set_path,
};

/// A single schema-less record
pub type Document = Map<String, Value>;

/// Name of the store-level identity field
pub const ID_FIELD: &str = "_id";

/// Converts a JSON value into a document.
///
/// Returns None for anything that is not a JSON object.
pub fn into_document(value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
