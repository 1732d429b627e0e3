//! Per-collection index catalog
//!
//! Maintains the built-in `_id_` index and every user index of one
//! collection.
//!
//! # API
//!
//! - `check_unique(doc, exclude)` - Reject a write that would duplicate a unique key
//! - `apply_insert(seq, doc)` - Update indexes after a document is stored
//! - `apply_remove(seq, doc)` - Update indexes after a document is removed
//! - `create(spec, options, docs)` / `drop(spec, locale)` - Index lifecycle
//! - `plan_equality(filter)` - Candidate sequence numbers for an equality filter

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::document::{canonical_key, resolve, Document, ID_FIELD};
use crate::executor::{QueryError, QueryResult};
use crate::filter::Filter;

use super::btree::{DocSeq, IndexKey, IndexTree};
use super::spec::{IndexDescription, IndexOptions, IndexSpec};

/// Name of the built-in identity index
pub const ID_INDEX_NAME: &str = "_id_";

/// One index and its usage counters
#[derive(Debug)]
pub struct IndexEntry {
    name: String,
    spec: IndexSpec,
    unique: bool,
    collation: Option<Document>,
    tree: IndexTree,
    /// Set once any indexed value was an array
    multikey: bool,
    accesses: AtomicU64,
    since: DateTime<Utc>,
}

impl IndexEntry {
    fn new(name: String, spec: IndexSpec, options: &IndexOptions) -> Self {
        Self {
            name,
            spec,
            unique: options.unique,
            collation: options.collation.clone(),
            tree: IndexTree::new(),
            multikey: false,
            accesses: AtomicU64::new(0),
            since: Utc::now(),
        }
    }

    /// Index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key spec
    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Number of lookups served by this index
    pub fn accesses(&self) -> u64 {
        self.accesses.load(Ordering::Relaxed)
    }

    fn locale(&self) -> Option<&str> {
        self.collation
            .as_ref()
            .and_then(|c| c.get("locale"))
            .and_then(Value::as_str)
    }

    fn same_definition(&self, spec: &IndexSpec, options: &IndexOptions) -> bool {
        self.spec == *spec && self.unique == options.unique && self.collation == options.collation
    }

    /// Extracts the compound key of a document.
    ///
    /// Returns the key and whether any component came from an array.
    fn key_for(&self, doc: &Document) -> (Vec<IndexKey>, bool) {
        let mut multikey = false;
        let key = self
            .spec
            .fields()
            .iter()
            .map(|(field, _)| {
                let values = resolve(doc, field);
                match values.as_slice() {
                    [] => IndexKey::Null,
                    [single] => {
                        multikey |= single.is_array();
                        IndexKey::from_json(single)
                    }
                    many => {
                        multikey = true;
                        let collected: Vec<Value> = many.iter().map(|v| (*v).clone()).collect();
                        IndexKey::Composite(canonical_key(&Value::Array(collected)))
                    }
                }
            })
            .collect();
        (key, multikey)
    }

    fn insert(&mut self, seq: DocSeq, doc: &Document) {
        let (key, multikey) = self.key_for(doc);
        self.multikey |= multikey;
        self.tree.insert(key, seq);
    }

    fn duplicate_of(&self, doc: &Document, exclude: Option<DocSeq>) -> Option<Vec<IndexKey>> {
        let (key, _) = self.key_for(doc);
        let clash = self
            .tree
            .lookup_eq(&key)
            .iter()
            .any(|seq| Some(*seq) != exclude);
        clash.then_some(key)
    }

    fn describe(&self) -> IndexDescription {
        IndexDescription {
            v: 2,
            key: self.spec.to_document(),
            name: self.name.clone(),
            unique: (self.unique && self.name != ID_INDEX_NAME).then_some(true),
            collation: self.collation.clone(),
        }
    }
}

/// Index catalog of one collection
#[derive(Debug)]
pub struct IndexCatalog {
    collection: String,
    /// Indexes in creation order; `_id_` is always first
    entries: Vec<IndexEntry>,
}

impl IndexCatalog {
    /// Creates a catalog holding only the `_id_` index
    pub fn new(collection: impl Into<String>) -> Self {
        let id_index = IndexEntry::new(
            ID_INDEX_NAME.to_string(),
            IndexSpec::ascending(ID_FIELD),
            &IndexOptions::default().unique(),
        );
        Self {
            collection: collection.into(),
            entries: vec![id_index],
        }
    }

    /// Indexes in creation order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Rejects `doc` if it would duplicate a key of any unique index.
    ///
    /// `exclude` names the document being replaced, which may keep its keys.
    pub fn check_unique(&self, doc: &Document, exclude: Option<DocSeq>) -> QueryResult<()> {
        for entry in self.entries.iter().filter(|e| e.unique) {
            if entry.duplicate_of(doc, exclude).is_some() {
                return Err(self.duplicate_error(entry, doc));
            }
        }
        Ok(())
    }

    fn duplicate_error(&self, entry: &IndexEntry, doc: &Document) -> QueryError {
        let dup_key: Document = entry
            .spec
            .fields()
            .iter()
            .map(|(field, _)| {
                let value = resolve(doc, field).first().map(|v| (*v).clone());
                (field.clone(), value.unwrap_or(Value::Null))
            })
            .collect();
        QueryError::duplicate_key(format!(
            "E11000 duplicate key error collection: {} index: {} dup key: {}",
            self.collection,
            entry.name,
            Value::Object(dup_key)
        ))
    }

    /// Updates every index after `doc` was stored under `seq`.
    ///
    /// Called AFTER `check_unique` succeeded.
    pub fn apply_insert(&mut self, seq: DocSeq, doc: &Document) {
        for entry in &mut self.entries {
            entry.insert(seq, doc);
        }
    }

    /// Removes `doc` from every index.
    pub fn apply_remove(&mut self, seq: DocSeq, doc: &Document) {
        for entry in &mut self.entries {
            let (key, _) = entry.key_for(doc);
            entry.tree.remove(&key, seq);
        }
    }

    /// Drops every indexed entry, keeping index definitions.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.tree.clear();
            entry.multikey = false;
        }
    }

    /// Creates an index and builds it over `docs`.
    ///
    /// Returns the index name and whether a new index was built. Creating an
    /// identical index again is a no-op.
    pub fn create<'a>(
        &mut self,
        spec: &IndexSpec,
        options: &IndexOptions,
        docs: impl Iterator<Item = (DocSeq, &'a Document)>,
    ) -> QueryResult<(String, bool)> {
        let name = options.name.clone().unwrap_or_else(|| spec.default_name());

        if let Some(existing) = self.entries.iter().find(|e| e.name == name) {
            if existing.same_definition(spec, options) {
                return Ok((name, false));
            }
            return Err(QueryError::validation(format!(
                "index '{}' already exists with a different definition",
                name
            )));
        }
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.spec == *spec && e.locale() == options.locale())
        {
            return Err(QueryError::validation(format!(
                "index with key {} already exists as '{}'",
                Value::Object(spec.to_document()),
                existing.name
            )));
        }

        let mut entry = IndexEntry::new(name.clone(), spec.clone(), options);
        for (seq, doc) in docs {
            if entry.unique && entry.duplicate_of(doc, None).is_some() {
                return Err(self.duplicate_error(&entry, doc));
            }
            entry.insert(seq, doc);
        }

        self.entries.push(entry);
        Ok((name, true))
    }

    /// Drops the index with the given key spec.
    ///
    /// When `locale` is given only an index with that collation locale
    /// matches. Returns false if nothing matched.
    pub fn drop(&mut self, spec: &IndexSpec, locale: Option<&str>) -> QueryResult<bool> {
        let position = self
            .entries
            .iter()
            .position(|e| e.spec == *spec && (locale.is_none() || e.locale() == locale));

        match position {
            Some(0) => Err(QueryError::validation("cannot drop _id index")),
            Some(pos) => {
                self.entries.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops the index with the given name. Returns false if absent.
    pub fn drop_by_name(&mut self, name: &str) -> QueryResult<bool> {
        if name == ID_INDEX_NAME {
            return Err(QueryError::validation("cannot drop _id index"));
        }
        match self.entries.iter().position(|e| e.name == name) {
            Some(pos) => {
                self.entries.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Index descriptions in creation order
    pub fn describe(&self) -> Vec<IndexDescription> {
        self.entries.iter().map(IndexEntry::describe).collect()
    }

    /// One usage document per index
    pub fn stats(&self) -> Vec<Document> {
        self.entries
            .iter()
            .map(|entry| {
                let stats = json!({
                    "name": entry.name,
                    "key": Value::Object(entry.spec.to_document()),
                    "accesses": {
                        "ops": entry.accesses(),
                        "since": entry.since.to_rfc3339(),
                    },
                });
                match stats {
                    Value::Object(map) => map,
                    _ => Document::new(),
                }
            })
            .collect()
    }

    /// Finds candidate sequence numbers for `filter` through an index.
    ///
    /// Uses the first non-multikey index whose leading field has a required
    /// equality in the filter and returns its name with the candidates.
    /// Returns None when no index applies, in which case the caller scans
    /// the collection.
    pub fn plan_equality(&self, filter: &Filter) -> Option<(&str, Vec<DocSeq>)> {
        for entry in self.entries.iter().filter(|e| !e.multikey) {
            if let Some(value) = filter.required_equality(entry.spec.first_field()) {
                entry.accesses.fetch_add(1, Ordering::Relaxed);
                let seqs = entry.tree.lookup_prefix(&IndexKey::from_json(value));
                return Some((entry.name.as_str(), seqs));
            }
        }
        None
    }
}
