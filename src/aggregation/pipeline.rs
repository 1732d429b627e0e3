//! Pipeline execution
//!
//! Stages run in declaration order; each consumes the full output of the
//! previous one. A leading `$match` reads its input through the collection
//! scan planner so that indexes can narrow it.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::document::{canonical_key, get_path, overwrite_path, remove_path, resolve, Document};
use crate::executor::{QueryError, QueryResult};
use crate::storage::DocumentStore;

use super::stage::{GroupSpec, LookupSpec, Stage, UnwindSpec};

/// A validated aggregation pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Parses an array of stage objects
    pub fn parse(value: &Value) -> QueryResult<Self> {
        let Value::Array(items) = value else {
            return Err(QueryError::validation(format!(
                "pipeline must be an array of stages, got {}",
                value
            )));
        };

        let stages = items
            .iter()
            .map(Stage::parse)
            .collect::<QueryResult<Vec<_>>>()?;

        if let Some(position) = stages
            .iter()
            .skip(1)
            .position(|s| matches!(s, Stage::IndexStats))
        {
            return Err(QueryError::validation(format!(
                "$indexStats is only valid as the first stage, found at position {}",
                position + 1
            )));
        }

        Ok(Self { stages })
    }

    /// Stages in execution order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs the pipeline over `collection`.
    ///
    /// An absent collection is read as empty; the caller decides whether
    /// that is an error.
    pub fn execute(
        &self,
        store: &DocumentStore,
        collection: &str,
        use_indexes: bool,
    ) -> QueryResult<Vec<Document>> {
        let source = store.collection(collection);

        let (mut documents, rest) = match (self.stages.first(), source) {
            (Some(Stage::IndexStats), Some(c)) => (c.indexes().stats(), &self.stages[1..]),
            (Some(Stage::IndexStats), None) => (Vec::new(), &self.stages[1..]),
            (Some(Stage::Match(filter)), Some(c)) => (
                c.matching(filter, use_indexes)
                    .map(|(_, doc)| doc.clone())
                    .collect(),
                &self.stages[1..],
            ),
            (_, Some(c)) => (c.iter().map(|(_, doc)| doc.clone()).collect(), &self.stages[..]),
            (_, None) => (Vec::new(), &self.stages[..]),
        };

        for stage in rest {
            documents = apply_stage(stage, documents, store)?;
        }
        Ok(documents)
    }
}

fn apply_stage(
    stage: &Stage,
    mut documents: Vec<Document>,
    store: &DocumentStore,
) -> QueryResult<Vec<Document>> {
    match stage {
        Stage::Match(filter) => {
            documents.retain(|doc| filter.matches(doc));
            Ok(documents)
        }
        Stage::Project(projection) => documents.iter().map(|doc| projection.apply(doc)).collect(),
        Stage::Group(spec) => group(spec, &documents),
        Stage::Sort(spec) => Ok(spec.sort(documents)),
        Stage::Limit(n) => {
            documents.truncate(usize::try_from(*n).unwrap_or(usize::MAX));
            Ok(documents)
        }
        Stage::Skip(n) => {
            let n = usize::try_from(*n).unwrap_or(usize::MAX).min(documents.len());
            documents.drain(..n);
            Ok(documents)
        }
        Stage::Lookup(spec) => Ok(lookup(spec, documents, store)),
        Stage::Unwind(spec) => Ok(unwind(spec, documents)),
        Stage::Count(field) => {
            if documents.is_empty() {
                return Ok(documents);
            }
            let mut out = Document::new();
            out.insert(field.clone(), Value::from(documents.len() as u64));
            Ok(vec![out])
        }
        Stage::IndexStats => Err(QueryError::validation(
            "$indexStats is only valid as the first stage",
        )),
    }
}

fn group(spec: &GroupSpec, documents: &[Document]) -> QueryResult<Vec<Document>> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups = Vec::new();

    for doc in documents {
        let key = spec.id.evaluate_or_null(doc)?;
        let position = *positions.entry(canonical_key(&key)).or_insert_with(|| {
            let states = spec.fields.iter().map(|(_, acc)| acc.start()).collect::<Vec<_>>();
            groups.push((key, states));
            groups.len() - 1
        });

        let states = &mut groups[position].1;
        for ((_, acc), state) in spec.fields.iter().zip(states.iter_mut()) {
            acc.accumulate(state, doc)?;
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = Document::new();
            out.insert("_id".to_string(), key);
            for ((field, _), state) in spec.fields.iter().zip(states) {
                out.insert(field.clone(), state.finish());
            }
            out
        })
        .collect())
}

/// Join keys of a document: every value at `path` plus array elements.
/// A missing path joins as null.
fn join_keys(doc: &Document, path: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for value in resolve(doc, path) {
        keys.push(canonical_key(value));
        if let Value::Array(items) = value {
            keys.extend(items.iter().map(canonical_key));
        }
    }
    if keys.is_empty() {
        keys.push(canonical_key(&Value::Null));
    }
    keys.sort();
    keys.dedup();
    keys
}

fn lookup(spec: &LookupSpec, documents: Vec<Document>, store: &DocumentStore) -> Vec<Document> {
    let foreign: Vec<&Document> = store
        .collection(&spec.from)
        .map(|c| c.iter().map(|(_, doc)| doc).collect())
        .unwrap_or_default();

    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (position, doc) in foreign.iter().enumerate() {
        for key in join_keys(doc, &spec.foreign_field) {
            by_key.entry(key).or_default().push(position);
        }
    }

    documents
        .into_iter()
        .map(|mut doc| {
            let matched: BTreeSet<usize> = join_keys(&doc, &spec.local_field)
                .iter()
                .filter_map(|key| by_key.get(key))
                .flatten()
                .copied()
                .collect();
            let joined = matched
                .into_iter()
                .map(|position| Value::Object(foreign[position].clone()))
                .collect();
            overwrite_path(&mut doc, &spec.as_field, Value::Array(joined));
            doc
        })
        .collect()
}

/// Fans each document out over the array at `spec.path`.
///
/// The path is followed through nested objects only; a path that crosses an
/// array addresses nothing and the document is handled as if the field were
/// missing.
fn unwind(spec: &UnwindSpec, documents: Vec<Document>) -> Vec<Document> {
    let mut out = Vec::with_capacity(documents.len());

    for mut doc in documents {
        let items = match get_path(&doc, &spec.path) {
            Some(Value::Array(items)) => items.clone(),
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                if let Some(field) = &spec.include_array_index {
                    overwrite_path(&mut doc, field, Value::Null);
                }
                out.push(doc);
                continue;
            }
        };

        if items.is_empty() {
            if spec.preserve_null_and_empty {
                if matches!(get_path(&doc, &spec.path), Some(Value::Array(_))) {
                    remove_path(&mut doc, &spec.path);
                }
                if let Some(field) = &spec.include_array_index {
                    overwrite_path(&mut doc, field, Value::Null);
                }
                out.push(doc);
            }
            continue;
        }

        for (index, item) in items.into_iter().enumerate() {
            let mut copy = doc.clone();
            overwrite_path(&mut copy, &spec.path, item);
            if let Some(field) = &spec.include_array_index {
                overwrite_path(&mut copy, field, Value::from(index as u64));
            }
            out.push(copy);
        }
    }

    out
}
