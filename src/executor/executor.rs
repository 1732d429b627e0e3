//! Query executor for nutridb
//!
//! Runs every store operation against the owned `DocumentStore`.
//!
//! Read flow (strict order):
//! 1. Parse filter, projection and sort; malformed input is rejected here
//! 2. Resolve the collection (absent reads as empty unless strict)
//! 3. Narrow candidates through an index when one applies
//! 4. Filter candidates in insertion order
//! 5. Sort (stable), skip, limit, project
//!
//! Writes compute the full new state of a document before committing it.
//! Multi-document writes are not transactional: on failure, documents earlier
//! in insertion order stay written.

use std::collections::HashSet;

use serde_json::Value;

use crate::aggregation::Pipeline;
use crate::config::{ConfigResult, ExecutorConfig};
use crate::document::{canonical_key, compare_values, resolve, Document, ID_FIELD};
use crate::filter::{parse_filter, Filter};
use crate::index::{DocSeq, IndexDescription, IndexOptions, IndexSpec};
use crate::mapreduce::{
    MapFn, MapReduceJob, MapReduceOptions, MapReduceOutput, MapReduceResult, ReduceFn,
};
use crate::observability::{log_event, Event, Logger, MetricsRegistry, ObservationScope};
use crate::storage::{Collection, DocumentStore};

use super::cursor::{Cursor, FindOptions};
use super::errors::{QueryError, QueryResult};
use super::projection::Projection;
use super::result::{InsertManyResult, UpdateResult};
use super::sorter::SortSpec;
use super::update::UpdateSpec;

/// Executes queries and writes against an in-memory document store
#[derive(Debug)]
pub struct QueryExecutor {
    store: DocumentStore,
    config: ExecutorConfig,
    metrics: MetricsRegistry,
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryExecutor {
    /// Creates an executor over an empty store with default configuration
    pub fn new() -> Self {
        Self {
            store: DocumentStore::new(),
            config: ExecutorConfig::default(),
            metrics: MetricsRegistry::new(),
        }
    }

    /// Creates an executor with `config`.
    ///
    /// The configured log level becomes the process-wide minimum severity.
    pub fn with_config(config: ExecutorConfig) -> ConfigResult<Self> {
        Logger::set_min_severity(config.severity()?);
        log_event(
            Event::ConfigLoaded,
            &[
                ("strict_collections", &config.strict_collections.to_string()),
                ("use_indexes", &config.use_indexes.to_string()),
                ("log_level", &config.log_level),
            ],
        );

        Ok(Self {
            store: DocumentStore::new(),
            config,
            metrics: MetricsRegistry::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Operation counters
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Underlying store
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    // ==================
    // Writes
    // ==================

    /// Inserts one document and returns its `_id`.
    ///
    /// A missing `_id` is generated. The collection is created on first
    /// insert.
    pub fn insert_one(&mut self, collection: &str, document: Value) -> QueryResult<Value> {
        let result = self.insert_document(collection, document);
        if result.is_ok() {
            self.metrics.add_inserted(1);
            log_event(
                Event::InsertComplete,
                &[("collection", collection), ("inserted", "1")],
            );
        }
        self.observe("insert_one", collection, result)
    }

    /// Inserts documents in order, stopping at the first failure.
    ///
    /// Documents before the failing one stay inserted.
    pub fn insert_many(
        &mut self,
        collection: &str,
        documents: Vec<Value>,
    ) -> QueryResult<InsertManyResult> {
        let mut inserted = InsertManyResult::default();
        let mut failure = None;

        for document in documents {
            match self.insert_document(collection, document) {
                Ok(id) => inserted.inserted_ids.push(id),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        self.metrics.add_inserted(inserted.len() as u64);
        if !inserted.is_empty() {
            log_event(
                Event::InsertComplete,
                &[
                    ("collection", collection),
                    ("inserted", &inserted.len().to_string()),
                ],
            );
        }

        let result = match failure {
            Some(err) => Err(err),
            None => Ok(inserted),
        };
        self.observe("insert_many", collection, result)
    }

    /// Applies `update` to the first matching document in insertion order
    pub fn update_one(
        &mut self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> QueryResult<UpdateResult> {
        let result = self.update_documents(collection, filter, update, true);
        self.observe("update_one", collection, result)
    }

    /// Applies `update` to every matching document.
    ///
    /// Zero matches is not an error.
    pub fn update_many(
        &mut self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> QueryResult<UpdateResult> {
        let result = self.update_documents(collection, filter, update, false);
        self.observe("update_many", collection, result)
    }

    /// Removes every matching document, or only the first one in insertion
    /// order when `limit_to_one` is set. Returns the number removed.
    pub fn delete_many(
        &mut self,
        collection: &str,
        filter: &Value,
        limit_to_one: bool,
    ) -> QueryResult<u64> {
        let result = self.delete_documents(collection, filter, limit_to_one);
        self.observe("delete_many", collection, result)
    }

    // ==================
    // Reads
    // ==================

    /// Opens a cursor over the matching documents.
    ///
    /// Without a sort the cursor reads the collection lazily in insertion
    /// order; with one the matches are sorted up front.
    pub fn find(
        &self,
        collection: &str,
        filter: &Value,
        options: FindOptions,
    ) -> QueryResult<Cursor<'_>> {
        let result = self.open_cursor(collection, filter, options);
        self.observe("find", collection, result)
    }

    /// First matching document in insertion order
    pub fn find_one(
        &self,
        collection: &str,
        filter: &Value,
        projection: Value,
    ) -> QueryResult<Option<Document>> {
        let mut cursor = self.find(
            collection,
            filter,
            FindOptions::new().projection(projection).limit(1),
        )?;
        Ok(cursor.next())
    }

    /// Number of matching documents
    pub fn count(&self, collection: &str, filter: &Value) -> QueryResult<u64> {
        let result = self
            .matching_documents(collection, filter)
            .map(|docs| docs.len() as u64);
        if let Ok(count) = &result {
            log_event(
                Event::CountComplete,
                &[("collection", collection), ("count", &count.to_string())],
            );
        }
        self.observe("count", collection, result)
    }

    /// Distinct values of `field` among matching documents, in first-seen
    /// order. Array values contribute their elements.
    pub fn distinct(&self, collection: &str, field: &str, filter: &Value) -> QueryResult<Vec<Value>> {
        let result = self.distinct_values(collection, field, filter);
        self.observe("distinct", collection, result)
    }

    /// Like `distinct`, ordered by collation
    pub fn distinct_sorted(
        &self,
        collection: &str,
        field: &str,
        filter: &Value,
    ) -> QueryResult<Vec<Value>> {
        let mut values = self.distinct(collection, field, filter)?;
        values.sort_by(compare_values);
        Ok(values)
    }

    /// Runs an aggregation pipeline
    pub fn aggregate(&self, collection: &str, pipeline: &Value) -> QueryResult<Vec<Document>> {
        let result = self.run_pipeline(collection, pipeline);
        self.observe("aggregate", collection, result)
    }

    /// Runs a map-reduce over the documents matching `options.query`
    pub fn map_reduce(
        &mut self,
        collection: &str,
        map: &MapFn,
        reduce: &ReduceFn,
        options: MapReduceOptions,
    ) -> QueryResult<MapReduceResult> {
        let result = self.run_map_reduce(collection, map, reduce, options);
        self.observe("map_reduce", collection, result)
    }

    // ==================
    // Indexes
    // ==================

    /// Creates an index and returns its name.
    ///
    /// Creating an identical index again returns the existing name.
    pub fn create_index(
        &mut self,
        collection: &str,
        keys: &Value,
        options: &Value,
    ) -> QueryResult<String> {
        let result = self.build_index(collection, keys, options);
        self.observe("create_index", collection, result)
    }

    /// Drops the index with this key spec (and collation locale, when the
    /// options carry one). Returns false if there was none.
    pub fn drop_index(
        &mut self,
        collection: &str,
        keys: &Value,
        options: &Value,
    ) -> QueryResult<bool> {
        let result = self.remove_index(collection, keys, options);
        self.observe("drop_index", collection, result)
    }

    /// Drops an index by name. Returns false if there was none.
    pub fn drop_index_by_name(&mut self, collection: &str, name: &str) -> QueryResult<bool> {
        let strict = self.config.strict_collections;
        let result = match self.store.collection_mut(collection) {
            Some(target) => target.drop_index_by_name(name),
            None => absent(strict, collection, false),
        };
        if let Ok(true) = result {
            self.metrics.increment_index_drops();
            log_event(
                Event::IndexDropped,
                &[("collection", collection), ("index", name)],
            );
        }
        self.observe("drop_index", collection, result)
    }

    /// Index descriptions in creation order
    pub fn list_indexes(&self, collection: &str) -> QueryResult<Vec<IndexDescription>> {
        let result = self
            .source(collection)
            .map(|source| source.map(Collection::list_indexes).unwrap_or_default());
        self.observe("list_indexes", collection, result)
    }

    /// Per-index usage, as returned by the `$indexStats` stage
    pub fn index_stats(&self, collection: &str) -> QueryResult<Vec<Document>> {
        let result = self
            .source(collection)
            .map(|source| source.map(|c| c.indexes().stats()).unwrap_or_default());
        self.observe("index_stats", collection, result)
    }

    // ==================
    // Collections
    // ==================

    /// Removes a collection with its indexes. Returns false if it did not
    /// exist.
    pub fn drop_collection(&mut self, collection: &str) -> bool {
        self.store.drop_collection(collection)
    }

    /// Collection names in sorted order
    pub fn collection_names(&self) -> Vec<String> {
        self.store.collection_names()
    }

    // ==================
    // Internals
    // ==================

    /// Counts and logs a rejected operation, passing the result through
    fn observe<T>(&self, operation: &str, collection: &str, result: QueryResult<T>) -> QueryResult<T> {
        if let Err(err) = &result {
            self.metrics.increment_queries_rejected();
            log_event(
                Event::QueryRejected,
                &[
                    ("operation", operation),
                    ("collection", collection),
                    ("code", err.code().code()),
                    ("message", err.message()),
                ],
            );
        }
        result
    }

    fn source(&self, collection: &str) -> QueryResult<Option<&Collection>> {
        match self.store.collection(collection) {
            Some(source) => Ok(Some(source)),
            None => absent(self.config.strict_collections, collection, None),
        }
    }

    fn insert_document(&mut self, collection: &str, document: Value) -> QueryResult<Value> {
        let fields = match document {
            Value::Object(fields) => fields,
            other => {
                return Err(QueryError::validation(format!(
                    "document must be an object, got {}",
                    other
                )))
            }
        };

        let id = match fields.get(ID_FIELD) {
            Some(Value::Array(_)) => {
                return Err(QueryError::validation("_id cannot be an array"));
            }
            Some(id) => id.clone(),
            None => self.store.generate_id(),
        };

        let mut stored = Document::new();
        stored.insert(ID_FIELD.to_string(), id.clone());
        stored.extend(fields.into_iter().filter(|(key, _)| key != ID_FIELD));

        self.store.get_or_create(collection).insert(stored)?;
        Ok(id)
    }

    fn update_documents(
        &mut self,
        collection: &str,
        filter: &Value,
        update: &Value,
        just_one: bool,
    ) -> QueryResult<UpdateResult> {
        let filter = parse_filter(filter)?;
        let update = UpdateSpec::parse(update)?;
        let strict = self.config.strict_collections;
        let use_indexes = self.config.use_indexes;

        let Some(target) = self.store.collection_mut(collection) else {
            return absent(strict, collection, UpdateResult::default());
        };
        let seqs = select(target, &filter, use_indexes, just_one, &self.metrics);

        let mut result = UpdateResult::default();
        let outcome = apply_update(target, seqs, &update, &mut result);
        self.metrics.add_modified(result.modified);
        outcome?;

        log_event(
            Event::UpdateComplete,
            &[
                ("collection", collection),
                ("matched", &result.matched.to_string()),
                ("modified", &result.modified.to_string()),
            ],
        );
        Ok(result)
    }

    fn delete_documents(
        &mut self,
        collection: &str,
        filter: &Value,
        limit_to_one: bool,
    ) -> QueryResult<u64> {
        let filter = parse_filter(filter)?;
        let strict = self.config.strict_collections;
        let use_indexes = self.config.use_indexes;

        let Some(target) = self.store.collection_mut(collection) else {
            return absent(strict, collection, 0);
        };
        let seqs = select(target, &filter, use_indexes, limit_to_one, &self.metrics);

        let deleted = seqs
            .into_iter()
            .filter_map(|seq| target.remove(seq))
            .count() as u64;

        self.metrics.add_deleted(deleted);
        log_event(
            Event::DeleteComplete,
            &[
                ("collection", collection),
                ("deleted", &deleted.to_string()),
            ],
        );
        Ok(deleted)
    }

    fn open_cursor(
        &self,
        collection: &str,
        filter: &Value,
        options: FindOptions,
    ) -> QueryResult<Cursor<'_>> {
        let filter = parse_filter(filter)?;
        let projection = Projection::parse(&options.projection)?;
        let sort = match &options.sort {
            Value::Null => None,
            sort => Some(SortSpec::parse(sort)?),
        };

        self.metrics.increment_queries_executed();
        let Some(source) = self.source(collection)? else {
            return Ok(Cursor::empty());
        };

        let plan = source.plan(&filter, self.config.use_indexes);
        if plan.index.is_some() {
            self.metrics.increment_index_scans();
        }
        log_event(
            Event::FindComplete,
            &[
                ("collection", collection),
                ("index", plan.index.as_deref().unwrap_or("none")),
                ("sorted", &sort.is_some().to_string()),
            ],
        );

        let cursor = match sort {
            None => Cursor::scan(
                source,
                filter,
                plan.seqs,
                projection,
                options.skip,
                options.limit,
            ),
            Some(sort) => {
                let documents = plan
                    .seqs
                    .iter()
                    .filter_map(|seq| source.get(*seq))
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect();
                Cursor::sorted(sort.sort(documents), projection, options.skip, options.limit)
            }
        };
        Ok(cursor)
    }

    fn matching_documents(&self, collection: &str, filter: &Value) -> QueryResult<Vec<&Document>> {
        let filter = parse_filter(filter)?;
        self.metrics.increment_queries_executed();
        let Some(source) = self.source(collection)? else {
            return Ok(Vec::new());
        };

        let seqs = select(source, &filter, self.config.use_indexes, false, &self.metrics);
        Ok(seqs.into_iter().filter_map(|seq| source.get(seq)).collect())
    }

    fn distinct_values(&self, collection: &str, field: &str, filter: &Value) -> QueryResult<Vec<Value>> {
        if field.is_empty() || field.starts_with('$') {
            return Err(QueryError::validation(format!(
                "invalid distinct field '{}'",
                field
            )));
        }

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for doc in self.matching_documents(collection, filter)? {
            for value in resolve(doc, field) {
                let candidates: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for candidate in candidates {
                    if seen.insert(canonical_key(candidate)) {
                        values.push(candidate.clone());
                    }
                }
            }
        }
        Ok(values)
    }

    fn run_pipeline(&self, collection: &str, pipeline: &Value) -> QueryResult<Vec<Document>> {
        let pipeline = Pipeline::parse(pipeline)?;
        self.source(collection)?;

        self.metrics.increment_queries_executed();
        self.metrics.increment_aggregations();

        let scope = ObservationScope::with_fields("AGGREGATE", &[("collection", collection)]);
        let documents = pipeline.execute(&self.store, collection, self.config.use_indexes)?;
        scope.complete_with_fields(&[
            ("stages", &pipeline.stages().len().to_string()),
            ("returned", &documents.len().to_string()),
        ]);

        Ok(documents)
    }

    fn run_map_reduce(
        &mut self,
        collection: &str,
        map: &MapFn,
        reduce: &ReduceFn,
        options: MapReduceOptions,
    ) -> QueryResult<MapReduceResult> {
        let query = parse_filter(&options.query)?;
        if let MapReduceOutput::Replace(name) = &options.out {
            if name.is_empty() {
                return Err(QueryError::validation("map-reduce output collection name cannot be empty"));
            }
        }

        self.metrics.increment_queries_executed();
        self.metrics.increment_map_reduce_runs();

        let scope = ObservationScope::with_fields("MAP_REDUCE", &[("collection", collection)]);
        let job = MapReduceJob::new(map, reduce);
        let output = match self.source(collection)? {
            Some(source) => {
                let seqs = select(source, &query, self.config.use_indexes, false, &self.metrics);
                job.run(seqs.into_iter().filter_map(|seq| source.get(seq)))?
            }
            None => job.run(std::iter::empty())?,
        };

        let output_count = output.documents.len() as u64;
        let (output_collection, documents) = match options.out {
            MapReduceOutput::Inline => (None, Some(output.documents)),
            MapReduceOutput::Replace(name) => {
                let target = self.store.get_or_create(&name);
                target.clear();
                for document in output.documents {
                    target.insert(document)?;
                }
                self.metrics.add_inserted(output_count);
                (Some(name), None)
            }
        };

        scope.complete_with_fields(&[
            ("input", &output.input_count.to_string()),
            ("emitted", &output.emit_count.to_string()),
            ("output", &output_count.to_string()),
        ]);

        Ok(MapReduceResult {
            output_collection,
            input_count: output.input_count,
            emit_count: output.emit_count,
            output_count,
            documents,
        })
    }

    fn build_index(&mut self, collection: &str, keys: &Value, options: &Value) -> QueryResult<String> {
        let spec = IndexSpec::parse(keys)?;
        let options = IndexOptions::parse(options)?;

        let (name, created) = self
            .store
            .get_or_create(collection)
            .create_index(&spec, &options)?;

        if created {
            self.metrics.increment_index_builds();
            log_event(
                Event::IndexCreated,
                &[("collection", collection), ("index", &name)],
            );
        }
        Ok(name)
    }

    fn remove_index(&mut self, collection: &str, keys: &Value, options: &Value) -> QueryResult<bool> {
        let spec = IndexSpec::parse(keys)?;
        let options = IndexOptions::parse(options)?;
        let strict = self.config.strict_collections;

        let Some(target) = self.store.collection_mut(collection) else {
            return absent(strict, collection, false);
        };
        let dropped = target.drop_index(&spec, options.locale())?;

        if dropped {
            self.metrics.increment_index_drops();
            log_event(
                Event::IndexDropped,
                &[("collection", collection), ("index", &spec.default_name())],
            );
        }
        Ok(dropped)
    }
}

/// Result for an absent collection: empty, or NotFound in strict mode
fn absent<T>(strict: bool, collection: &str, empty: T) -> QueryResult<T> {
    if strict {
        Err(QueryError::not_found(collection))
    } else {
        Ok(empty)
    }
}

/// Matching sequence numbers in insertion order
fn select(
    collection: &Collection,
    filter: &Filter,
    use_indexes: bool,
    limit_to_one: bool,
    metrics: &MetricsRegistry,
) -> Vec<DocSeq> {
    let plan = collection.plan(filter, use_indexes);
    if plan.index.is_some() {
        metrics.increment_index_scans();
    }

    let matching = plan
        .seqs
        .into_iter()
        .filter(|seq| collection.get(*seq).is_some_and(|doc| filter.matches(doc)));
    if limit_to_one {
        matching.take(1).collect()
    } else {
        matching.collect()
    }
}

fn apply_update(
    target: &mut Collection,
    seqs: Vec<DocSeq>,
    update: &UpdateSpec,
    result: &mut UpdateResult,
) -> QueryResult<()> {
    for seq in seqs {
        let Some(current) = target.get(seq) else {
            continue;
        };
        result.matched += 1;
        if let Some(updated) = update.apply(current)? {
            target.replace(seq, updated)?;
            result.modified += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::QueryErrorCode;
    use serde_json::json;

    fn executor_with_food() -> QueryExecutor {
        let mut executor = QueryExecutor::new();
        for (id, description, calories) in [
            (1, "CHEESE, BLUE", 353),
            (2, "CHEESE, BRICK", 371),
            (3, "BUTTER, SALTED", 717),
        ] {
            executor
                .insert_one(
                    "Food",
                    json!({"ID": id, "Description": description, "Calories": calories}),
                )
                .unwrap();
        }
        executor
    }

    #[test]
    fn test_insert_generates_id_first() {
        let mut executor = QueryExecutor::new();
        let id = executor.insert_one("Food", json!({"ID": 7})).unwrap();
        assert!(id.is_string());

        let doc = executor
            .find_one("Food", &json!({"ID": 7}), Value::Null)
            .unwrap()
            .unwrap();
        assert_eq!(doc.keys().next().map(String::as_str), Some("_id"));
        assert_eq!(doc["_id"], id);
    }

    #[test]
    fn test_insert_rejects_non_object() {
        let mut executor = QueryExecutor::new();
        let err = executor.insert_one("Food", json!([1, 2])).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(executor.metrics().snapshot().queries_rejected, 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut executor = QueryExecutor::new();
        executor.insert_one("Food", json!({"_id": 1})).unwrap();
        let err = executor.insert_one("Food", json!({"_id": 1})).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::DuplicateKey);
    }

    #[test]
    fn test_update_one_touches_first_match_only() {
        let mut executor = executor_with_food();
        let result = executor
            .update_one("Food", &json!({"Description": {"$regex": "^CHEESE"}}), &json!({"$set": {"Flag": true}}))
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 1, modified: 1 });
        assert_eq!(executor.count("Food", &json!({"Flag": true})).unwrap(), 1);
        assert_eq!(executor.find_one("Food", &json!({"Flag": true}), Value::Null).unwrap().unwrap()["ID"], json!(1));
    }

    #[test]
    fn test_update_unchanged_document_not_modified() {
        let mut executor = executor_with_food();
        let result = executor
            .update_many("Food", &json!({"ID": 1}), &json!({"$set": {"Calories": 353}}))
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 1, modified: 0 });
    }

    #[test]
    fn test_absent_collection_is_empty_unless_strict() {
        let executor = QueryExecutor::new();
        assert_eq!(executor.count("Nope", &json!({})).unwrap(), 0);
        assert!(executor.aggregate("Nope", &json!([])).unwrap().is_empty());

        let strict = QueryExecutor::with_config(ExecutorConfig::strict()).unwrap();
        let err = strict.count("Nope", &json!({})).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::NotFound);
    }

    #[test]
    fn test_distinct_first_seen_and_sorted() {
        let mut executor = QueryExecutor::new();
        executor.insert_one("Tags", json!({"t": ["b", "a"]})).unwrap();
        executor.insert_one("Tags", json!({"t": "c"})).unwrap();
        executor.insert_one("Tags", json!({"t": "a"})).unwrap();

        assert_eq!(
            executor.distinct("Tags", "t", &Value::Null).unwrap(),
            vec![json!("b"), json!("a"), json!("c")]
        );
        assert_eq!(
            executor.distinct_sorted("Tags", "t", &Value::Null).unwrap(),
            vec![json!("a"), json!("b"), json!("c")]
        );
    }

    #[test]
    fn test_find_counts_index_scans() {
        let mut executor = executor_with_food();
        executor.create_index("Food", &json!({"ID": 1}), &Value::Null).unwrap();

        let docs: Vec<_> = executor
            .find("Food", &json!({"ID": 2}), FindOptions::new())
            .unwrap()
            .collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(executor.metrics().snapshot().index_scans, 1);
    }

    #[test]
    fn test_index_use_can_be_disabled() {
        let config = ExecutorConfig {
            use_indexes: false,
            ..ExecutorConfig::default()
        };
        let mut executor = QueryExecutor::with_config(config).unwrap();
        executor.insert_one("Food", json!({"ID": 2})).unwrap();
        executor.create_index("Food", &json!({"ID": 1}), &Value::Null).unwrap();

        assert_eq!(executor.count("Food", &json!({"ID": 2})).unwrap(), 1);
        assert_eq!(executor.metrics().snapshot().index_scans, 0);
    }

    #[test]
    fn test_map_reduce_inline_writes_nothing() {
        let mut executor = executor_with_food();
        let map = MapFn::emit("$Calories", 1).unwrap();
        let result = executor
            .map_reduce("Food", &map, &ReduceFn::Count, MapReduceOptions::inline())
            .unwrap();
        assert_eq!(result.output_collection, None);
        assert_eq!(result.output_count, 3);
        assert_eq!(result.documents.map(|d| d.len()), Some(3));
        assert_eq!(executor.collection_names(), vec!["Food".to_string()]);
    }
}
