//! Command and Configuration Tests
//!
//! Tests for the declarative surface and ambient stack:
//! - Commands round-trip through JSON and drive every operation
//! - Outcomes serialize with a kind tag
//! - Configuration loads from a file, with defaults and validation
//! - Log lines are single JSON objects
//! - Metrics reflect executed operations

use std::io::Write;

use nutridb::config::{ConfigError, ExecutorConfig};
use nutridb::executor::{Command, CommandOutcome, QueryErrorCode, QueryExecutor};
use nutridb::observability::{Logger, Severity};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

// =============================================================================
// Helper Functions
// =============================================================================

fn run(executor: &mut QueryExecutor, command: Value) -> Value {
    let command: Command = serde_json::from_value(command).unwrap();
    let outcome = executor.run(command).unwrap();
    serde_json::to_value(outcome).unwrap()
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// =============================================================================
// Command Tests
// =============================================================================

/// A command survives serialization unchanged.
#[test]
fn test_command_json_round_trip() {
    let command = Command::MapReduce {
        collection: "PortionsAndWeights".into(),
        emit: serde_json::from_value(json!({"key": "$Foodcode", "value": "$Portionweight"})).unwrap(),
        reduce: serde_json::from_value(json!("sum")).unwrap(),
        query: json!({"WWEIACategorycode": 5502}),
        out: Some("Calc_weight".into()),
    };

    let text = serde_json::to_string(&command).unwrap();
    let parsed = Command::from_json_str(&text).unwrap();
    assert_eq!(parsed, command);

    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["op"], json!("mapReduce"));
}

/// The nutrition workflow driven entirely by commands.
#[test]
fn test_command_workflow() {
    let mut executor = QueryExecutor::new();

    let inserted = run(
        &mut executor,
        json!({"op": "insertMany", "collection": "Food", "documents": [
            {"_id": 1, "ID": 93601, "Calories": 367, "Iron": 2},
            {"_id": 2, "ID": 93602, "Calories": 367, "Iron": 3},
            {"_id": 3, "ID": 93603, "Calories": 50, "Iron": 1}
        ]}),
    );
    assert_eq!(inserted, json!({"kind": "insertedMany", "result": {"inserted_ids": [1, 2, 3]}}));

    let updated = run(
        &mut executor,
        json!({"op": "updateMany", "collection": "Food", "filter": {"Calories": 367}, "update": {"$inc": {"Iron": 1}}}),
    );
    assert_eq!(updated, json!({"kind": "updated", "result": {"matched": 2, "modified": 2}}));

    let found = run(
        &mut executor,
        json!({"op": "find", "collection": "Food", "filter": {}, "sort": {"Iron": -1}, "limit": 1, "projection": {"ID": 1}}),
    );
    assert_eq!(found, json!({"kind": "documents", "result": [{"_id": 2, "ID": 93602}]}));

    let counted = run(&mut executor, json!({"op": "count", "collection": "Food", "filter": {"Iron": {"$gt": 1}}}));
    assert_eq!(counted, json!({"kind": "count", "result": 2}));

    let distinct = run(
        &mut executor,
        json!({"op": "distinct", "collection": "Food", "field": "Calories", "sorted": true}),
    );
    assert_eq!(distinct, json!({"kind": "values", "result": [50, 367]}));

    let aggregated = run(
        &mut executor,
        json!({"op": "aggregate", "collection": "Food", "pipeline": [
            {"$group": {"_id": "$Calories", "iron": {"$sum": "$Iron"}}},
            {"$sort": {"_id": 1}}
        ]}),
    );
    assert_eq!(
        aggregated,
        json!({"kind": "documents", "result": [{"_id": 50, "iron": 1}, {"_id": 367, "iron": 7}]})
    );

    let reduced = run(
        &mut executor,
        json!({"op": "mapReduce", "collection": "Food",
               "emit": {"key": "$ID", "value": "$Iron"}, "reduce": "sum",
               "query": {"Calories": 367}, "out": "IronContent"}),
    );
    assert_eq!(reduced["kind"], json!("mapReduce"));
    assert_eq!(reduced["result"]["output_collection"], json!("IronContent"));
    assert_eq!(reduced["result"]["output_count"], json!(2));

    let created = run(
        &mut executor,
        json!({"op": "createIndex", "collection": "Food", "keys": {"ID": 1}, "options": {"collation": {"locale": "en"}}}),
    );
    assert_eq!(created, json!({"kind": "indexCreated", "result": "ID_1"}));

    let listed = run(&mut executor, json!({"op": "listIndexes", "collection": "Food"}));
    assert_eq!(listed["result"].as_array().map(Vec::len), Some(2));

    let dropped = run(
        &mut executor,
        json!({"op": "dropIndex", "collection": "Food", "keys": {"ID": 1}}),
    );
    assert_eq!(dropped, json!({"kind": "indexDropped", "result": true}));

    let deleted = run(
        &mut executor,
        json!({"op": "deleteMany", "collection": "Food", "filter": {"Calories": 367}, "justOne": true}),
    );
    assert_eq!(deleted, json!({"kind": "deleted", "result": 1}));
}

/// A failing command surfaces the operation's error.
#[test]
fn test_command_errors() {
    let mut executor = QueryExecutor::new();
    run(&mut executor, json!({"op": "insertOne", "collection": "Food", "document": {"_id": 1}}));

    let err = executor
        .run_json(r#"{"op": "insertOne", "collection": "Food", "document": {"_id": 1}}"#)
        .unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::DuplicateKey);

    let err = executor.run_json(r#"{"op": "find", "collection": "#).unwrap_err();
    assert!(err.is_validation());
}

/// Outcome variants carry their payload under "result".
#[test]
fn test_outcome_serialization() {
    let outcome = CommandOutcome::Inserted(json!("abc"));
    assert_eq!(
        serde_json::to_value(outcome).unwrap(),
        json!({"kind": "inserted", "result": "abc"})
    );
}

// =============================================================================
// Configuration Tests
// =============================================================================

/// Defaults apply to omitted fields.
#[test]
fn test_config_file_defaults() {
    let file = config_file(r#"{"strict_collections": true}"#);
    let config = ExecutorConfig::load(file.path()).unwrap();
    assert!(config.strict_collections);
    assert!(config.use_indexes);
    assert_eq!(config.log_level, "warn");
}

/// Strict configuration turns absent collections into NotFound.
#[test]
fn test_strict_config_from_file() {
    let file = config_file(r#"{"strict_collections": true, "log_level": "warn"}"#);
    let config = ExecutorConfig::load(file.path()).unwrap();
    let mut executor = QueryExecutor::with_config(config).unwrap();

    let err = executor
        .update_many("Food", &json!({}), &json!({"$set": {"x": 1}}))
        .unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::NotFound);
    assert_eq!(err.to_string(), "[NUTRI_NOT_FOUND] collection 'Food' does not exist");

    executor.insert_one("Food", json!({"x": 1})).unwrap();
    assert_eq!(executor.count("Food", &json!({})).unwrap(), 1);
}

/// Invalid values, unknown keys and unreadable files are errors.
#[test]
fn test_config_errors() {
    let file = config_file(r#"{"log_level": "verbose"}"#);
    assert!(matches!(
        ExecutorConfig::load(file.path()),
        Err(ConfigError::Invalid { field: "log_level", .. })
    ));

    let file = config_file(r#"{"cache_size": 10}"#);
    assert!(matches!(ExecutorConfig::load(file.path()), Err(ConfigError::Parse(_))));

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(matches!(ExecutorConfig::load(&missing), Err(ConfigError::Read { .. })));
}

// =============================================================================
// Observability Tests
// =============================================================================

/// Log lines are one JSON object with sorted fields.
#[test]
fn test_log_line_format() {
    let line = Logger::format_line(
        Severity::Warn,
        "QUERY_REJECTED",
        &[("collection", "Food"), ("code", "NUTRI_VALIDATION_FAILED")],
    );
    let parsed: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["event"], json!("QUERY_REJECTED"));
    assert_eq!(parsed["severity"], json!("WARN"));
    assert_eq!(parsed["collection"], json!("Food"));
    assert_eq!(line.matches('\n').count(), 1);
    assert!(line.ends_with("}\n"));
}

/// Counters follow the operations that ran.
#[test]
fn test_metrics_track_operations() {
    let mut executor = QueryExecutor::new();
    executor.insert_one("Food", json!({"ID": 1})).unwrap();
    executor.insert_one("Food", json!({"ID": 2})).unwrap();
    executor
        .update_many("Food", &json!({}), &json!({"$set": {"seen": true}}))
        .unwrap();
    executor.aggregate("Food", &json!([{"$match": {}}])).unwrap();
    let _ = executor.count("Food", &json!({"$bad": 1}));

    let snapshot = executor.metrics().snapshot();
    assert_eq!(snapshot.documents_inserted, 2);
    assert_eq!(snapshot.documents_modified, 2);
    assert_eq!(snapshot.aggregations, 1);
    assert_eq!(snapshot.queries_rejected, 1);

    let exported: Value = serde_json::from_str(&executor.metrics().to_json()).unwrap();
    assert_eq!(exported["documents_inserted"], json!(2));
}
