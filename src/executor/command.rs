//! Declarative commands
//!
//! Every store operation as a JSON object tagged by `"op"`:
//!
//! ```json
//! {"op": "find", "collection": "Food", "filter": {"ID": 93601}, "limit": 1}
//! {"op": "mapReduce", "collection": "Food",
//!  "emit": {"key": "$ID", "value": "$Iron"}, "reduce": "sum",
//!  "query": {"Calories": 367}, "out": "IronContent"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::index::IndexDescription;
use crate::mapreduce::{
    BuiltinReducer, EmitSpec, MapFn, MapReduceOptions, MapReduceOutput, MapReduceResult, ReduceFn,
};

use super::cursor::FindOptions;
use super::errors::{QueryError, QueryResult};
use super::executor::QueryExecutor;
use super::result::{InsertManyResult, UpdateResult};

/// One store operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Command {
    InsertOne {
        collection: String,
        document: Value,
    },
    InsertMany {
        collection: String,
        documents: Vec<Value>,
    },
    UpdateOne {
        collection: String,
        #[serde(default)]
        filter: Value,
        update: Value,
    },
    UpdateMany {
        collection: String,
        #[serde(default)]
        filter: Value,
        update: Value,
    },
    DeleteMany {
        collection: String,
        #[serde(default)]
        filter: Value,
        #[serde(default, rename = "justOne")]
        just_one: bool,
    },
    Find {
        collection: String,
        #[serde(default)]
        filter: Value,
        #[serde(default)]
        projection: Value,
        #[serde(default)]
        sort: Value,
        #[serde(default)]
        skip: u64,
        #[serde(default)]
        limit: Option<u64>,
    },
    Count {
        collection: String,
        #[serde(default)]
        filter: Value,
    },
    Distinct {
        collection: String,
        field: String,
        #[serde(default)]
        filter: Value,
        #[serde(default)]
        sorted: bool,
    },
    Aggregate {
        collection: String,
        pipeline: Value,
    },
    MapReduce {
        collection: String,
        emit: EmitSpec,
        reduce: BuiltinReducer,
        #[serde(default)]
        query: Value,
        /// Output collection; absent returns results inline
        #[serde(default)]
        out: Option<String>,
    },
    CreateIndex {
        collection: String,
        keys: Value,
        #[serde(default)]
        options: Value,
    },
    DropIndex {
        collection: String,
        keys: Value,
        #[serde(default)]
        options: Value,
    },
    ListIndexes {
        collection: String,
    },
}

impl Command {
    /// Parses a command from JSON text
    pub fn from_json_str(text: &str) -> QueryResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| QueryError::validation(format!("malformed command: {}", e)))
    }

    /// Target collection
    pub fn collection(&self) -> &str {
        match self {
            Command::InsertOne { collection, .. }
            | Command::InsertMany { collection, .. }
            | Command::UpdateOne { collection, .. }
            | Command::UpdateMany { collection, .. }
            | Command::DeleteMany { collection, .. }
            | Command::Find { collection, .. }
            | Command::Count { collection, .. }
            | Command::Distinct { collection, .. }
            | Command::Aggregate { collection, .. }
            | Command::MapReduce { collection, .. }
            | Command::CreateIndex { collection, .. }
            | Command::DropIndex { collection, .. }
            | Command::ListIndexes { collection } => collection,
        }
    }
}

/// Result of a command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "camelCase")]
pub enum CommandOutcome {
    /// `_id` of the inserted document
    Inserted(Value),
    InsertedMany(InsertManyResult),
    Updated(UpdateResult),
    /// Number of removed documents
    Deleted(u64),
    Documents(Vec<Document>),
    Count(u64),
    /// Distinct values
    Values(Vec<Value>),
    MapReduce(MapReduceResult),
    /// Name of the created (or already existing) index
    IndexCreated(String),
    /// Whether an index was removed
    IndexDropped(bool),
    Indexes(Vec<IndexDescription>),
}

impl QueryExecutor {
    /// Executes a command
    pub fn run(&mut self, command: Command) -> QueryResult<CommandOutcome> {
        let outcome = match command {
            Command::InsertOne {
                collection,
                document,
            } => CommandOutcome::Inserted(self.insert_one(&collection, document)?),
            Command::InsertMany {
                collection,
                documents,
            } => CommandOutcome::InsertedMany(self.insert_many(&collection, documents)?),
            Command::UpdateOne {
                collection,
                filter,
                update,
            } => CommandOutcome::Updated(self.update_one(&collection, &filter, &update)?),
            Command::UpdateMany {
                collection,
                filter,
                update,
            } => CommandOutcome::Updated(self.update_many(&collection, &filter, &update)?),
            Command::DeleteMany {
                collection,
                filter,
                just_one,
            } => CommandOutcome::Deleted(self.delete_many(&collection, &filter, just_one)?),
            Command::Find {
                collection,
                filter,
                projection,
                sort,
                skip,
                limit,
            } => {
                let options = FindOptions {
                    projection,
                    sort,
                    skip,
                    limit,
                };
                CommandOutcome::Documents(self.find(&collection, &filter, options)?.collect())
            }
            Command::Count { collection, filter } => {
                CommandOutcome::Count(self.count(&collection, &filter)?)
            }
            Command::Distinct {
                collection,
                field,
                filter,
                sorted,
            } => {
                let values = if sorted {
                    self.distinct_sorted(&collection, &field, &filter)?
                } else {
                    self.distinct(&collection, &field, &filter)?
                };
                CommandOutcome::Values(values)
            }
            Command::Aggregate {
                collection,
                pipeline,
            } => CommandOutcome::Documents(self.aggregate(&collection, &pipeline)?),
            Command::MapReduce {
                collection,
                emit,
                reduce,
                query,
                out,
            } => {
                let map = MapFn::from_spec(&emit)?;
                let reduce = ReduceFn::from(reduce);
                let options = MapReduceOptions {
                    query,
                    out: match out {
                        Some(name) => MapReduceOutput::Replace(name),
                        None => MapReduceOutput::Inline,
                    },
                };
                CommandOutcome::MapReduce(self.map_reduce(&collection, &map, &reduce, options)?)
            }
            Command::CreateIndex {
                collection,
                keys,
                options,
            } => CommandOutcome::IndexCreated(self.create_index(&collection, &keys, &options)?),
            Command::DropIndex {
                collection,
                keys,
                options,
            } => CommandOutcome::IndexDropped(self.drop_index(&collection, &keys, &options)?),
            Command::ListIndexes { collection } => {
                CommandOutcome::Indexes(self.list_indexes(&collection)?)
            }
        };
        Ok(outcome)
    }

    /// Parses and executes a command given as JSON text
    pub fn run_json(&mut self, text: &str) -> QueryResult<CommandOutcome> {
        let command = Command::from_json_str(text)?;
        self.run(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_parses_by_op_tag() {
        let command: Command = serde_json::from_value(json!({
            "op": "deleteMany",
            "collection": "Food",
            "filter": {"ID": 1},
            "justOne": true
        }))
        .unwrap();
        assert_eq!(
            command,
            Command::DeleteMany {
                collection: "Food".into(),
                filter: json!({"ID": 1}),
                just_one: true,
            }
        );
        assert_eq!(command.collection(), "Food");
    }

    #[test]
    fn test_unknown_op_is_validation_error() {
        let err = Command::from_json_str(r#"{"op": "eval", "collection": "Food"}"#).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_run_insert_then_find() {
        let mut executor = QueryExecutor::new();
        executor
            .run_json(r#"{"op": "insertOne", "collection": "Food", "document": {"_id": 1, "ID": 93601}}"#)
            .unwrap();

        let outcome = executor
            .run_json(r#"{"op": "find", "collection": "Food", "filter": {"ID": 93601}}"#)
            .unwrap();
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"kind": "documents", "result": [{"_id": 1, "ID": 93601}]})
        );
    }

    #[test]
    fn test_run_map_reduce_inline() {
        let mut executor = QueryExecutor::new();
        executor
            .insert_many(
                "Food",
                vec![json!({"ID": 1, "Iron": 2}), json!({"ID": 1, "Iron": 3})],
            )
            .unwrap();

        let outcome = executor
            .run(Command::MapReduce {
                collection: "Food".into(),
                emit: EmitSpec {
                    key: json!("$ID"),
                    value: json!("$Iron"),
                },
                reduce: BuiltinReducer::Sum,
                query: Value::Null,
                out: None,
            })
            .unwrap();

        match outcome {
            CommandOutcome::MapReduce(result) => {
                assert_eq!(result.output_count, 1);
                assert_eq!(
                    result.documents.unwrap()[0]["value"],
                    json!(5)
                );
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
