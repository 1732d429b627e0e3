//! Lazy find cursors

use serde_json::Value;

use crate::document::Document;
use crate::filter::Filter;
use crate::index::DocSeq;
use crate::storage::Collection;

use super::projection::Projection;

/// Options of a `find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Projection object; null returns whole documents
    pub projection: Value,
    /// Sort object; null keeps insertion order
    pub sort: Value,
    /// Number of leading results to drop
    pub skip: u64,
    /// Maximum number of results; `None` or 0 means unlimited
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Default options: whole documents in insertion order
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the projection
    pub fn projection(mut self, projection: Value) -> Self {
        self.projection = projection;
        self
    }

    /// Sets the sort
    pub fn sort(mut self, sort: Value) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the skip count
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the limit
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

enum Source<'a> {
    /// Filters candidates while iterating
    Scan {
        collection: &'a Collection,
        filter: Filter,
        seqs: std::vec::IntoIter<DocSeq>,
    },
    /// Already filtered and sorted
    Sorted(std::vec::IntoIter<Document>),
}

/// A finite, single-pass sequence of query results.
///
/// Unsorted cursors read the collection lazily; a consumed cursor cannot be
/// restarted.
pub struct Cursor<'a> {
    source: Source<'a>,
    projection: Projection,
    skip: u64,
    remaining: Option<u64>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn scan(
        collection: &'a Collection,
        filter: Filter,
        seqs: Vec<DocSeq>,
        projection: Projection,
        skip: u64,
        limit: Option<u64>,
    ) -> Self {
        Self {
            source: Source::Scan {
                collection,
                filter,
                seqs: seqs.into_iter(),
            },
            projection,
            skip,
            remaining: limit.filter(|l| *l > 0),
        }
    }

    pub(crate) fn sorted(
        documents: Vec<Document>,
        projection: Projection,
        skip: u64,
        limit: Option<u64>,
    ) -> Self {
        Self {
            source: Source::Sorted(documents.into_iter()),
            projection,
            skip,
            remaining: limit.filter(|l| *l > 0),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::sorted(Vec::new(), Projection::all(), 0, None)
    }

    fn next_match(&mut self) -> Option<Document> {
        match &mut self.source {
            Source::Scan {
                collection,
                filter,
                seqs,
            } => {
                let collection: &'a Collection = *collection;
                seqs.filter_map(move |seq| collection.get(seq))
                    .find(|doc| filter.matches(doc))
                    .map(|doc| self.projection.apply_fields(doc))
            }
            Source::Sorted(documents) => {
                let doc = documents.next()?;
                if self.projection.is_identity() {
                    Some(doc)
                } else {
                    Some(self.projection.apply_fields(&doc))
                }
            }
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        if self.remaining == Some(0) {
            return None;
        }
        while self.skip > 0 {
            self.next_match()?;
            self.skip -= 1;
        }
        let doc = self.next_match()?;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(doc)
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.source {
            Source::Scan { .. } => "scan",
            Source::Sorted(_) => "sorted",
        };
        f.debug_struct("Cursor")
            .field("mode", &mode)
            .field("skip", &self.skip)
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::into_document;
    use serde_json::json;

    fn collection() -> Collection {
        let mut collection = Collection::new("Food");
        for i in 1..=5 {
            collection
                .insert(into_document(json!({"_id": i, "ID": i, "even": i % 2 == 0})).unwrap())
                .unwrap();
        }
        collection
    }

    fn all_seqs(collection: &Collection) -> Vec<DocSeq> {
        collection.iter().map(|(s, _)| s).collect()
    }

    #[test]
    fn test_scan_filters_lazily() {
        let collection = collection();
        let cursor = Cursor::scan(
            &collection,
            Filter::eq("even", json!(false)),
            all_seqs(&collection),
            Projection::all(),
            0,
            None,
        );
        let ids: Vec<_> = cursor.map(|d| d["ID"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3), json!(5)]);
    }

    #[test]
    fn test_skip_and_limit() {
        let collection = collection();
        let cursor = Cursor::scan(
            &collection,
            Filter::all(),
            all_seqs(&collection),
            Projection::all(),
            1,
            Some(2),
        );
        let ids: Vec<_> = cursor.map(|d| d["ID"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(3)]);
    }

    #[test]
    fn test_cursor_not_restartable() {
        let collection = collection();
        let mut cursor = Cursor::scan(
            &collection,
            Filter::all(),
            all_seqs(&collection),
            Projection::all(),
            0,
            Some(1),
        );
        assert!(cursor.next().is_some());
        assert!(cursor.next().is_none());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let cursor = Cursor::sorted(
            vec![into_document(json!({"a": 1})).unwrap()],
            Projection::all(),
            0,
            Some(0),
        );
        assert_eq!(cursor.count(), 1);
        assert_eq!(Cursor::empty().count(), 0);
    }
}
