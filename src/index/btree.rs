//! BTreeMap-based index structures
//!
//! Indexes use BTreeMap<Vec<IndexKey>, Vec<DocSeq>> for deterministic ordering.
//! Sequence numbers under a key are always sorted ascending, which is
//! insertion order.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::document::{canonical_key, Numeric};

/// Document sequence number within a collection
pub type DocSeq = u64;

/// Index key representing one indexed field value.
///
/// Numbers that are equal under collation produce the same key, through
/// `Numeric::normalized`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Missing field or explicit null
    Null,
    /// Integer value
    Int(i64),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
    /// Boolean value
    Bool(bool),
    /// Array or object, keyed by its canonical form
    Composite(String),
}

impl IndexKey {
    /// Create a key from a float that holds no exact integer
    ///
    /// Uses bit representation for total ordering.
    fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from a JSON value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => IndexKey::Null,
            Value::Bool(b) => IndexKey::Bool(*b),
            Value::Number(_) => match Numeric::from_value(value).map(Numeric::normalized) {
                Some(Numeric::Int(i)) => IndexKey::Int(i),
                Some(Numeric::Float(f)) => IndexKey::from_float(f),
                None => IndexKey::Null,
            },
            Value::String(s) => IndexKey::String(s.clone()),
            Value::Array(_) | Value::Object(_) => IndexKey::Composite(canonical_key(value)),
        }
    }
}

/// A single index using BTreeMap for deterministic ordering.
#[derive(Debug, Default, Clone)]
pub struct IndexTree {
    /// Maps compound keys to sorted lists of sequence numbers
    tree: BTreeMap<Vec<IndexKey>, Vec<DocSeq>>,
}

impl IndexTree {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a sequence number for a key.
    ///
    /// Maintains sorted ascending order.
    pub fn insert(&mut self, key: Vec<IndexKey>, seq: DocSeq) {
        let seqs = self.tree.entry(key).or_default();
        if let Err(pos) = seqs.binary_search(&seq) {
            seqs.insert(pos, seq);
        }
    }

    /// Remove a sequence number for a key.
    ///
    /// If the key has no more entries, removes the key entirely.
    pub fn remove(&mut self, key: &[IndexKey], seq: DocSeq) {
        if let Some(seqs) = self.tree.get_mut(key) {
            if let Ok(pos) = seqs.binary_search(&seq) {
                seqs.remove(pos);
            }
            if seqs.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Lookup all sequence numbers for an exact key match.
    pub fn lookup_eq(&self, key: &[IndexKey]) -> &[DocSeq] {
        self.tree.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lookup all sequence numbers whose first key component equals `first`.
    ///
    /// Returns sequence numbers sorted ascending.
    pub fn lookup_prefix(&self, first: &IndexKey) -> Vec<DocSeq> {
        let start = vec![first.clone()];
        let mut result: Vec<DocSeq> = self
            .tree
            .range(start..)
            .take_while(|(key, _)| key.first() == Some(first))
            .flat_map(|(_, seqs)| seqs.iter().copied())
            .collect();

        result.sort_unstable();
        result
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.tree.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(v: Value) -> Vec<IndexKey> {
        vec![IndexKey::from_json(&v)]
    }

    #[test]
    fn test_key_ordering() {
        let keys = vec![
            IndexKey::Null,
            IndexKey::Int(-100),
            IndexKey::Int(0),
            IndexKey::Int(100),
            IndexKey::String("aaa".into()),
            IndexKey::String("zzz".into()),
        ];

        for i in 1..keys.len() {
            assert!(keys[i - 1] < keys[i], "Keys should be ordered");
        }
    }

    #[test]
    fn test_integral_float_matches_int() {
        assert_eq!(IndexKey::from_json(&json!(5.0)), IndexKey::from_json(&json!(5)));
        assert_ne!(IndexKey::from_json(&json!(5.5)), IndexKey::from_json(&json!(5)));
    }

    #[test]
    fn test_keys_at_i64_boundary_follow_equality() {
        assert_ne!(
            IndexKey::from_json(&json!(i64::MAX)),
            IndexKey::from_json(&json!(9.223372036854776e18))
        );
        assert_eq!(
            IndexKey::from_json(&json!(i64::MIN)),
            IndexKey::from_json(&json!(-9.223372036854776e18))
        );
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut tree = IndexTree::new();

        tree.insert(key(json!("alice")), 100);
        tree.insert(key(json!("bob")), 200);
        tree.insert(key(json!("alice")), 50);

        assert_eq!(tree.lookup_eq(&key(json!("alice"))), &[50, 100]);
        assert_eq!(tree.lookup_eq(&key(json!("bob"))), &[200]);
        assert!(tree.lookup_eq(&key(json!("carol"))).is_empty());
    }

    #[test]
    fn test_remove() {
        let mut tree = IndexTree::new();

        tree.insert(key(json!(1)), 1);
        tree.insert(key(json!(1)), 2);
        tree.remove(&key(json!(1)), 1);
        assert_eq!(tree.lookup_eq(&key(json!(1))), &[2]);

        tree.remove(&key(json!(1)), 2);
        assert!(tree.lookup_eq(&key(json!(1))).is_empty());
        assert!(tree.lookup_prefix(&IndexKey::Int(1)).is_empty());
    }

    #[test]
    fn test_prefix_lookup_on_compound_key() {
        let mut tree = IndexTree::new();

        tree.insert(vec![IndexKey::Int(1), IndexKey::String("b".into())], 7);
        tree.insert(vec![IndexKey::Int(1), IndexKey::String("a".into())], 9);
        tree.insert(vec![IndexKey::Int(2), IndexKey::String("a".into())], 3);

        assert_eq!(tree.lookup_prefix(&IndexKey::Int(1)), vec![7, 9]);
        assert_eq!(tree.lookup_prefix(&IndexKey::Int(2)), vec![3]);
        assert!(tree.lookup_prefix(&IndexKey::Int(3)).is_empty());
    }
}
