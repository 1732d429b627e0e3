//! Aggregation Pipeline Tests
//!
//! Tests for pipeline invariants:
//! - $group with an empty-string _id collapses the input into one group
//! - $lookup is a left-outer equality join
//! - $lookup + $unwind fans out one document per foreign match
//! - $unwind preserve mode keeps documents without elements
//! - $indexStats reports index accesses
//! - Stage order is preserved exactly

use nutridb::executor::{QueryErrorCode, QueryExecutor};
use serde_json::{json, Map, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn executor_with(collection: &str, documents: Vec<Value>) -> QueryExecutor {
    let mut executor = QueryExecutor::new();
    executor.insert_many(collection, documents).unwrap();
    executor
}

fn strip_ids(docs: Vec<Map<String, Value>>) -> Vec<Value> {
    docs.into_iter()
        .map(|mut d| {
            d.shift_remove("_id");
            Value::Object(d)
        })
        .collect()
}

// =============================================================================
// $group Tests
// =============================================================================

/// Mean over the whole collection matches the hand-computed value.
#[test]
fn test_group_empty_id_average() {
    let executor = executor_with(
        "Food",
        vec![
            json!({"ID": 1, "Calories": 100}),
            json!({"ID": 2, "Calories": 250}),
            json!({"ID": 3, "Calories": 30}),
            json!({"ID": 4, "Calories": 20}),
        ],
    );

    let out = executor
        .aggregate(
            "Food",
            &json!([{"$group": {"_id": "", "avgCalories": {"$avg": "$Calories"}}}]),
        )
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["_id"], json!(""));
    assert_eq!(out[0]["avgCalories"], json!(100.0));
}

/// Groups come out in first-seen order with $sum and $max.
#[test]
fn test_group_by_field() {
    let executor = executor_with(
        "Food",
        vec![
            json!({"cat": "b", "Sugar": 3}),
            json!({"cat": "a", "Sugar": 10}),
            json!({"cat": "b", "Sugar": 7}),
        ],
    );

    let out = executor
        .aggregate(
            "Food",
            &json!([{"$group": {
                "_id": "$cat",
                "total": {"$sum": "$Sugar"},
                "most": {"$max": "$Sugar"},
                "n": {"$sum": 1}
            }}]),
        )
        .unwrap();

    let out: Vec<Value> = out.into_iter().map(Value::Object).collect();
    assert_eq!(
        out,
        vec![
            json!({"_id": "b", "total": 10, "most": 7, "n": 2}),
            json!({"_id": "a", "total": 10, "most": 10, "n": 1}),
        ]
    );
}

/// $sum over a string is a type mismatch.
#[test]
fn test_group_sum_non_numeric_rejected() {
    let executor = executor_with("Food", vec![json!({"Sugar": "lots"})]);
    let err = executor
        .aggregate("Food", &json!([{"$group": {"_id": null, "s": {"$sum": "$Sugar"}}}]))
        .unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::TypeMismatch);
}

// =============================================================================
// $lookup / $unwind Tests
// =============================================================================

fn joined_executor() -> QueryExecutor {
    let mut executor = executor_with("Local", vec![json!({"ID": 1}), json!({"ID": 2})]);
    executor
        .insert_many(
            "Foreign",
            vec![json!({"ID": 1, "x": 1}), json!({"ID": 1, "x": 2}), json!({"ID": 3, "x": 3})],
        )
        .unwrap();
    executor
}

/// Two foreign matches unwind into two documents.
#[test]
fn test_lookup_then_unwind() {
    let executor = joined_executor();

    let out = executor
        .aggregate(
            "Local",
            &json!([
                {"$match": {"ID": 1}},
                {"$lookup": {"from": "Foreign", "localField": "ID", "foreignField": "ID", "as": "p"}},
                {"$unwind": "$p"},
                {"$project": {"_id": 0, "ID": 1, "x": "$p.x"}}
            ]),
        )
        .unwrap();

    let out: Vec<Value> = out.into_iter().map(Value::Object).collect();
    assert_eq!(out, vec![json!({"ID": 1, "x": 1}), json!({"ID": 1, "x": 2})]);
}

/// Without a pre-filter, the local document with no foreign match unwinds to nothing.
#[test]
fn test_lookup_then_unwind_drops_unmatched() {
    let executor = joined_executor();

    let out = executor
        .aggregate(
            "Local",
            &json!([
                {"$lookup": {"from": "Foreign", "localField": "ID", "foreignField": "ID", "as": "p"}},
                {"$unwind": "$p"}
            ]),
        )
        .unwrap();

    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|d| d["ID"] == json!(1)));
    assert_eq!(out[0]["p"]["x"], json!(1));
    assert_eq!(out[1]["p"]["x"], json!(2));
}

/// A path into the joined array addresses nothing, so no copies are emitted.
#[test]
fn test_unwind_through_joined_array() {
    let executor = joined_executor();

    let out = executor
        .aggregate(
            "Local",
            &json!([
                {"$lookup": {"from": "Foreign", "localField": "ID", "foreignField": "ID", "as": "p"}},
                {"$unwind": "$p.x"}
            ]),
        )
        .unwrap();
    assert!(out.is_empty());

    let executor = executor_with("Food", vec![json!({"ID": 1, "a": [{"b": 10}, {"b": 20}]})]);
    let out = executor.aggregate("Food", &json!([{"$unwind": "$a.b"}])).unwrap();
    assert!(out.is_empty());
}

/// Unmatched local documents keep an empty array.
#[test]
fn test_lookup_is_left_outer() {
    let executor = joined_executor();

    let out = executor
        .aggregate(
            "Local",
            &json!([{"$lookup": {"from": "Foreign", "localField": "ID", "foreignField": "ID", "as": "p"}}]),
        )
        .unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["p"].as_array().map(Vec::len), Some(2));
    assert_eq!(out[1]["p"], json!([]));
}

/// Without preserve, documents with no elements disappear; with it they stay.
#[test]
fn test_unwind_preserve_mode() {
    let executor = joined_executor();
    let lookup = json!({"$lookup": {"from": "Foreign", "localField": "ID", "foreignField": "ID", "as": "p"}});

    let dropped = executor
        .aggregate("Local", &json!([lookup.clone(), {"$unwind": "$p"}]))
        .unwrap();
    assert_eq!(dropped.len(), 2);
    assert!(dropped.iter().all(|d| d["ID"] == json!(1)));

    let kept = executor
        .aggregate(
            "Local",
            &json!([
                lookup,
                {"$unwind": {"path": "$p", "preserveNullAndEmptyArrays": true, "includeArrayIndex": "i"}}
            ]),
        )
        .unwrap();
    assert_eq!(kept.len(), 3);
    assert_eq!(kept[0]["i"], json!(0));
    assert_eq!(kept[1]["i"], json!(1));
    assert_eq!(kept[2]["ID"], json!(2));
    assert!(!kept[2].contains_key("p"));
    assert_eq!(kept[2]["i"], Value::Null);
}

/// Filtering on a joined array field after the lookup.
#[test]
fn test_match_on_joined_field() {
    let executor = joined_executor();
    let out = executor
        .aggregate(
            "Local",
            &json!([
                {"$lookup": {"from": "Foreign", "localField": "ID", "foreignField": "ID", "as": "p"}},
                {"$match": {"p.x": {"$gt": 1}}}
            ]),
        )
        .unwrap();
    assert_eq!(strip_ids(out).len(), 1);
}

// =============================================================================
// Stage Ordering Tests
// =============================================================================

/// $sort then $limit differs from $limit then $sort.
#[test]
fn test_stage_order_preserved() {
    let executor = executor_with(
        "Food",
        vec![json!({"v": 3}), json!({"v": 1}), json!({"v": 2})],
    );

    let sorted_first = executor
        .aggregate("Food", &json!([{"$sort": {"v": 1}}, {"$limit": 1}]))
        .unwrap();
    let limited_first = executor
        .aggregate("Food", &json!([{"$limit": 1}, {"$sort": {"v": 1}}]))
        .unwrap();

    assert_eq!(sorted_first[0]["v"], json!(1));
    assert_eq!(limited_first[0]["v"], json!(3));
}

/// Computed fields in $project.
#[test]
fn test_project_expressions() {
    let executor = executor_with(
        "Food",
        vec![json!({"Description": "Cheese, blue", "Protein": 21, "Fat": 28.5})],
    );

    let out = executor
        .aggregate(
            "Food",
            &json!([{"$project": {
                "_id": 0,
                "name": {"$toUpper": {"$arrayElemAt": [{"$split": ["$Description", ","]}, 0]}},
                "macros": {"$add": ["$Protein", "$Fat"]}
            }}]),
        )
        .unwrap();

    assert_eq!(out[0]["name"], json!("CHEESE"));
    assert_eq!(out[0]["macros"], json!(49.5));
}

/// $count names the output field and emits nothing for empty input.
#[test]
fn test_count_stage() {
    let executor = executor_with("Food", vec![json!({"v": 1}), json!({"v": 2})]);

    let out = executor
        .aggregate("Food", &json!([{"$match": {"v": {"$gt": 0}}}, {"$count": "n"}]))
        .unwrap();
    assert_eq!(Value::Object(out[0].clone()), json!({"n": 2}));

    let none = executor
        .aggregate("Food", &json!([{"$match": {"v": 9}}, {"$count": "n"}]))
        .unwrap();
    assert!(none.is_empty());
}

// =============================================================================
// Validation Tests
// =============================================================================

/// Malformed pipelines are rejected before anything runs.
#[test]
fn test_invalid_pipelines() {
    let executor = executor_with("Food", vec![json!({"v": 1})]);

    for pipeline in [
        json!({"$match": {}}),
        json!([{"$bogus": {}}]),
        json!([{"$limit": 0}]),
        json!([{"$match": {}, "$limit": 1}]),
        json!([{"$lookup": {"from": "x"}}]),
        json!([{"$match": {}}, {"$indexStats": {}}]),
    ] {
        let err = executor.aggregate("Food", &pipeline).unwrap_err();
        assert!(err.is_validation(), "pipeline {}", pipeline);
    }
}

// =============================================================================
// $indexStats Tests
// =============================================================================

/// Each index-assisted query counts one access.
#[test]
fn test_index_stats_counts_accesses() {
    let mut executor = executor_with(
        "Food",
        vec![json!({"ID": 1}), json!({"ID": 2}), json!({"ID": 3})],
    );
    executor
        .create_index("Food", &json!({"ID": 1}), &Value::Null)
        .unwrap();

    executor.count("Food", &json!({"ID": 2})).unwrap();
    executor.count("Food", &json!({"ID": 3})).unwrap();

    let stats = executor
        .aggregate("Food", &json!([{"$indexStats": {}}]))
        .unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0]["name"], json!("_id_"));
    assert_eq!(stats[0]["accesses"]["ops"], json!(0));
    assert_eq!(stats[1]["name"], json!("ID_1"));
    assert_eq!(stats[1]["key"], json!({"ID": 1}));
    assert_eq!(stats[1]["accesses"]["ops"], json!(2));
    assert!(stats[1]["accesses"]["since"].is_string());

    assert_eq!(executor.index_stats("Food").unwrap(), stats);
}
