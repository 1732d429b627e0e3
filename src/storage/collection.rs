//! A single named collection
//!
//! Documents live in a BTreeMap keyed by sequence number. Sequence numbers
//! are assigned in insertion order and never reused.

use std::collections::BTreeMap;

use crate::document::{Document, ID_FIELD};
use crate::executor::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::index::{DocSeq, IndexCatalog, IndexDescription, IndexOptions, IndexSpec};

/// Candidate documents for a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    /// Candidate sequence numbers, ascending
    pub seqs: Vec<DocSeq>,
    /// Name of the index that produced the candidates, if any
    pub index: Option<String>,
}

/// A named, insertion-ordered set of documents with its indexes
#[derive(Debug)]
pub struct Collection {
    name: String,
    documents: BTreeMap<DocSeq, Document>,
    next_seq: DocSeq,
    indexes: IndexCatalog,
}

impl Collection {
    /// Creates an empty collection with only the `_id_` index
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            indexes: IndexCatalog::new(name.clone()),
            name,
            documents: BTreeMap::new(),
            next_seq: 1,
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document by sequence number
    pub fn get(&self, seq: DocSeq) -> Option<&Document> {
        self.documents.get(&seq)
    }

    /// Documents in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (DocSeq, &Document)> + '_ {
        self.documents.iter().map(|(seq, doc)| (*seq, doc))
    }

    /// Index catalog
    pub fn indexes(&self) -> &IndexCatalog {
        &self.indexes
    }

    /// Stores a document that already carries an `_id`.
    ///
    /// Returns the assigned sequence number.
    pub fn insert(&mut self, document: Document) -> QueryResult<DocSeq> {
        if !document.contains_key(ID_FIELD) {
            return Err(QueryError::validation("document is missing _id"));
        }
        self.indexes.check_unique(&document, None)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.indexes.apply_insert(seq, &document);
        self.documents.insert(seq, document);
        Ok(seq)
    }

    /// Replaces the document stored under `seq`.
    ///
    /// The new state is checked against unique indexes before anything is
    /// written; on error the stored document is unchanged.
    pub fn replace(&mut self, seq: DocSeq, document: Document) -> QueryResult<()> {
        let Some(current) = self.documents.get(&seq) else {
            return Err(QueryError::validation(format!(
                "document {} no longer exists in '{}'",
                seq, self.name
            )));
        };
        if current.get(ID_FIELD) != document.get(ID_FIELD) {
            return Err(QueryError::validation("_id is immutable"));
        }
        self.indexes.check_unique(&document, Some(seq))?;

        self.indexes.apply_remove(seq, current);
        self.indexes.apply_insert(seq, &document);
        self.documents.insert(seq, document);
        Ok(())
    }

    /// Removes the document stored under `seq`
    pub fn remove(&mut self, seq: DocSeq) -> Option<Document> {
        let document = self.documents.remove(&seq)?;
        self.indexes.apply_remove(seq, &document);
        Some(document)
    }

    /// Removes every document, keeping index definitions
    pub fn clear(&mut self) {
        self.documents.clear();
        self.indexes.clear();
    }

    /// Candidate sequence numbers for `filter`.
    ///
    /// With `use_indexes`, an equality on the leading field of a usable index
    /// narrows the candidates; otherwise every document is a candidate. The
    /// filter must still be applied to each candidate.
    pub fn plan(&self, filter: &Filter, use_indexes: bool) -> ScanPlan {
        if use_indexes {
            if let Some((name, seqs)) = self.indexes.plan_equality(filter) {
                return ScanPlan {
                    seqs,
                    index: Some(name.to_string()),
                };
            }
        }
        ScanPlan {
            seqs: self.documents.keys().copied().collect(),
            index: None,
        }
    }

    /// Matching documents in insertion order
    pub fn matching<'a>(
        &'a self,
        filter: &'a Filter,
        use_indexes: bool,
    ) -> impl Iterator<Item = (DocSeq, &'a Document)> + 'a {
        self.plan(filter, use_indexes)
            .seqs
            .into_iter()
            .filter_map(move |seq| self.documents.get(&seq).map(|doc| (seq, doc)))
            .filter(move |(_, doc)| filter.matches(doc))
    }

    /// Creates an index over the current documents
    pub fn create_index(
        &mut self,
        spec: &IndexSpec,
        options: &IndexOptions,
    ) -> QueryResult<(String, bool)> {
        let documents = self.documents.iter().map(|(seq, doc)| (*seq, doc));
        self.indexes.create(spec, options, documents)
    }

    /// Drops an index by key spec and optional collation locale
    pub fn drop_index(&mut self, spec: &IndexSpec, locale: Option<&str>) -> QueryResult<bool> {
        self.indexes.drop(spec, locale)
    }

    /// Drops an index by name
    pub fn drop_index_by_name(&mut self, name: &str) -> QueryResult<bool> {
        self.indexes.drop_by_name(name)
    }

    /// Index descriptions in creation order
    pub fn list_indexes(&self) -> Vec<IndexDescription> {
        self.indexes.describe()
    }
}
