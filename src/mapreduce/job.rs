//! Map-reduce execution

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::document::{canonical_key, compare_values, Document, ID_FIELD};
use crate::executor::QueryResult;

use super::mapper::{Emitter, MapFn};
use super::reducer::ReduceFn;

/// Where map-reduce output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapReduceOutput {
    /// Replace the contents of the named collection
    Replace(String),
    /// Return the documents without writing anything
    Inline,
}

/// Options of a map-reduce run
#[derive(Debug, Clone, PartialEq)]
pub struct MapReduceOptions {
    /// Filter selecting the input documents; null selects all
    pub query: Value,
    /// Output target
    pub out: MapReduceOutput,
}

impl MapReduceOptions {
    /// Writes into `collection`, replacing its documents
    pub fn replace(collection: impl Into<String>) -> Self {
        Self {
            query: Value::Null,
            out: MapReduceOutput::Replace(collection.into()),
        }
    }

    /// Returns results inline
    pub fn inline() -> Self {
        Self {
            query: Value::Null,
            out: MapReduceOutput::Inline,
        }
    }

    /// Sets the input filter
    pub fn query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }
}

/// Summary of a map-reduce run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapReduceResult {
    /// Collection written, absent for inline output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_collection: Option<String>,
    /// Documents read
    pub input_count: u64,
    /// Pairs emitted
    pub emit_count: u64,
    /// Output documents produced
    pub output_count: u64,
    /// Output documents, present for inline output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Document>>,
}

/// One map-reduce computation, independent of any store
pub struct MapReduceJob<'a> {
    map: &'a MapFn,
    reduce: &'a ReduceFn,
}

/// Output of `MapReduceJob::run`
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub documents: Vec<Document>,
    pub input_count: u64,
    pub emit_count: u64,
}

impl<'a> MapReduceJob<'a> {
    pub fn new(map: &'a MapFn, reduce: &'a ReduceFn) -> Self {
        Self { map, reduce }
    }

    /// Maps every document, groups by key and reduces each group.
    pub fn run<'d>(&self, documents: impl IntoIterator<Item = &'d Document>) -> QueryResult<JobOutput> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
        let mut input_count = 0;
        let mut emit_count = 0;

        for doc in documents {
            input_count += 1;
            let mut emitter = Emitter::new();
            self.map.map(doc, &mut emitter)?;

            for (key, value) in emitter.into_pairs() {
                emit_count += 1;
                let canonical = canonical_key(&key);
                match positions.get(&canonical) {
                    Some(&position) => groups[position].1.push(value),
                    None => {
                        positions.insert(canonical, groups.len());
                        groups.push((key, vec![value]));
                    }
                }
            }
        }

        groups.sort_by(|(a, _), (b, _)| compare_values(a, b));

        let documents = groups
            .into_iter()
            .map(|(key, values)| {
                let reduced = self.reduce.reduce(&key, values)?;
                let mut out = Document::new();
                out.insert(ID_FIELD.to_string(), key);
                out.insert("value".to_string(), reduced);
                Ok(out)
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(JobOutput {
            documents,
            input_count,
            emit_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::into_document;
    use serde_json::json;

    #[test]
    fn test_sum_per_key_ordered_by_key() {
        let docs: Vec<Document> = [
            json!({"ID": "b", "Iron": 1}),
            json!({"ID": "a", "Iron": 2}),
            json!({"ID": "b", "Iron": 4}),
        ]
        .into_iter()
        .map(|v| into_document(v).unwrap())
        .collect();

        let map = MapFn::emit("$ID", "$Iron").unwrap();
        let reduce = ReduceFn::Sum;
        let out = MapReduceJob::new(&map, &reduce).run(&docs).unwrap();

        assert_eq!(out.input_count, 3);
        assert_eq!(out.emit_count, 3);
        assert_eq!(
            out.documents
                .into_iter()
                .map(Value::Object)
                .collect::<Vec<_>>(),
            vec![json!({"_id": "a", "value": 2}), json!({"_id": "b", "value": 5})]
        );
    }

    #[test]
    fn test_numeric_keys_group_across_representations() {
        let docs: Vec<Document> = [json!({"k": 1, "v": 1}), json!({"k": 1.0, "v": 1})]
            .into_iter()
            .map(|v| into_document(v).unwrap())
            .collect();
        let map = MapFn::emit("$k", "$v").unwrap();
        let reduce = ReduceFn::Count;
        let out = MapReduceJob::new(&map, &reduce).run(&docs).unwrap();
        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.documents[0]["value"], json!(2));
    }

    #[test]
    fn test_no_input_no_output() {
        let map = MapFn::emit("$k", "$v").unwrap();
        let reduce = ReduceFn::Sum;
        let out = MapReduceJob::new(&map, &reduce).run(std::iter::empty()).unwrap();
        assert!(out.documents.is_empty());
    }
}
