//! Named collections and `_id` generation

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;

use super::collection::Collection;

/// In-memory document store holding every named collection
#[derive(Debug, Default)]
pub struct DocumentStore {
    collections: BTreeMap<String, Collection>,
    id_counter: u64,
}

impl DocumentStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection by name, if it exists
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Mutable collection by name, if it exists
    pub fn collection_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.get_mut(name)
    }

    /// Collection by name, created empty on first use
    pub fn get_or_create(&mut self, name: &str) -> &mut Collection {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(name))
    }

    /// Removes a collection with its documents and indexes.
    ///
    /// Returns false if it did not exist.
    pub fn drop_collection(&mut self, name: &str) -> bool {
        self.collections.remove(name).is_some()
    }

    /// Collection names in sorted order
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    /// Generates a 24 hex digit `_id`.
    ///
    /// Eight digits of Unix seconds followed by sixteen digits of a per-store
    /// counter, so later ids sort after earlier ones.
    pub fn generate_id(&mut self) -> Value {
        self.id_counter += 1;
        let seconds = Utc::now().timestamp() as u32;
        Value::String(format!("{:08x}{:016x}", seconds, self.id_counter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_ordered_and_unique() {
        let mut store = DocumentStore::new();
        let first = store.generate_id();
        let second = store.generate_id();

        let (a, b) = (first.as_str().unwrap(), second.as_str().unwrap());
        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(a < b);
    }

    #[test]
    fn test_get_or_create_and_drop() {
        let mut store = DocumentStore::new();
        assert!(store.collection("Food").is_none());

        store.get_or_create("Food");
        store.get_or_create("Fat");
        assert_eq!(store.collection_names(), vec!["Fat".to_string(), "Food".to_string()]);

        assert!(store.drop_collection("Fat"));
        assert!(!store.drop_collection("Fat"));
        assert_eq!(store.collection_names(), vec!["Food".to_string()]);
    }
}
