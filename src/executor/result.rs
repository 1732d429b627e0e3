//! Result types for write operations

use serde::Serialize;
use serde_json::Value;

/// Result of `update_one` / `update_many`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    /// Documents matching the filter
    pub matched: u64,
    /// Documents whose content actually changed
    pub modified: u64,
}

impl UpdateResult {
    /// Returns true if nothing matched
    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

/// Result of `insert_many`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsertManyResult {
    /// `_id` of every inserted document, in input order
    pub inserted_ids: Vec<Value>,
}

impl InsertManyResult {
    /// Number of inserted documents
    pub fn len(&self) -> usize {
        self.inserted_ids.len()
    }

    /// Returns true if nothing was inserted
    pub fn is_empty(&self) -> bool {
        self.inserted_ids.is_empty()
    }
}
