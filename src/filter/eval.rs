//! Filter evaluation
//!
//! Conditions see every value found at the field path plus the elements of
//! any array among them, and succeed if one candidate satisfies them.
//! Range operators only compare values of the same type class; there is no
//! coercion between numbers and strings.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::{compare_values, resolve_flat, type_rank, values_equal, Document};

use super::ast::{Condition, Filter};

impl Filter {
    /// Checks whether a document matches this filter
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::And(children) => children.iter().all(|c| c.matches(document)),
            Filter::Or(children) => children.iter().any(|c| c.matches(document)),
            Filter::Nor(children) => !children.iter().any(|c| c.matches(document)),
            Filter::Field { path, conditions } => {
                let candidates = resolve_flat(document, path);
                conditions
                    .iter()
                    .all(|condition| condition_matches(condition, &candidates))
            }
        }
    }
}

fn condition_matches(condition: &Condition, candidates: &[&Value]) -> bool {
    match condition {
        Condition::Eq(expected) => eq_match(candidates, expected),
        Condition::Ne(expected) => !eq_match(candidates, expected),
        Condition::Gt(bound) => range_match(candidates, bound, |o| o == Ordering::Greater),
        Condition::Gte(bound) => range_match(candidates, bound, |o| o != Ordering::Less),
        Condition::Lt(bound) => range_match(candidates, bound, |o| o == Ordering::Less),
        Condition::Lte(bound) => range_match(candidates, bound, |o| o != Ordering::Greater),
        Condition::In(options) => options.iter().any(|o| eq_match(candidates, o)),
        Condition::Nin(options) => !options.iter().any(|o| eq_match(candidates, o)),
        Condition::Exists(expected) => !candidates.is_empty() == *expected,
        Condition::Regex(pattern) => candidates
            .iter()
            .any(|v| v.as_str().is_some_and(|s| pattern.is_match(s))),
    }
}

/// Equality; a missing field equals null
fn eq_match(candidates: &[&Value], expected: &Value) -> bool {
    if candidates.is_empty() {
        return expected.is_null();
    }
    candidates.iter().any(|v| values_equal(v, expected))
}

fn range_match(candidates: &[&Value], bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates.iter().any(|v| {
        comparable(v, bound) && accept(compare_values(v, bound))
    })
}

/// Range comparisons are only defined within a type class
fn comparable(a: &Value, b: &Value) -> bool {
    !a.is_array() && type_rank(a) == type_rank(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn matches(filter: Value, document: Value) -> bool {
        parse_filter(&filter).unwrap().matches(&doc(document))
    }

    #[test]
    fn test_equality_match() {
        assert!(matches(json!({"Description": "Sample Food"}), json!({"Description": "Sample Food"})));
        assert!(!matches(json!({"Description": "Sample Food"}), json!({"Description": "Other"})));
    }

    #[test]
    fn test_no_type_coercion() {
        assert!(!matches(json!({"ID": "93601"}), json!({"ID": 93601})));
        assert!(matches(json!({"ID": 93601}), json!({"ID": 93601})));
        assert!(matches(json!({"ID": 93601.0}), json!({"ID": 93601})));
    }

    #[test]
    fn test_gt_numeric_only() {
        assert!(matches(json!({"Sodium": {"$gt": 10000}}), json!({"Sodium": 27360})));
        assert!(!matches(json!({"Sodium": {"$gt": 10000}}), json!({"Sodium": 10000})));
        assert!(!matches(json!({"Sodium": {"$gt": 10000}}), json!({"Sodium": "27360"})));
        assert!(!matches(json!({"Sodium": {"$gt": 10000}}), json!({"Calories": 1})));
    }

    #[test]
    fn test_range_pair() {
        let filter = json!({"Calories": {"$gte": 100, "$lt": 200}});
        assert!(matches(filter.clone(), json!({"Calories": 100})));
        assert!(matches(filter.clone(), json!({"Calories": 199.5})));
        assert!(!matches(filter, json!({"Calories": 200})));
    }

    #[test]
    fn test_or_combinator() {
        let filter = json!({
            "WWEIA Category code": 2202,
            "$or": [{"Food code": 24100010}, {"Food code": 24100020}]
        });
        assert!(matches(filter.clone(), json!({"WWEIA Category code": 2202, "Food code": 24100020})));
        assert!(!matches(filter.clone(), json!({"WWEIA Category code": 2202, "Food code": 24100030})));
        assert!(!matches(filter, json!({"WWEIA Category code": 1, "Food code": 24100010})));
    }

    #[test]
    fn test_nor_combinator() {
        let filter = json!({"$nor": [{"Sugar": {"$gt": 50}}, {"Sodium": {"$gt": 500}}]});
        assert!(matches(filter.clone(), json!({"Sugar": 1, "Sodium": 1})));
        assert!(!matches(filter, json!({"Sugar": 60, "Sodium": 1})));
    }

    #[test]
    fn test_regex_prefix() {
        let filter = json!({"Description": {"$regex": "^CHEESE"}});
        assert!(matches(filter.clone(), json!({"Description": "CHEESE, CHEDDAR"})));
        assert!(!matches(filter.clone(), json!({"Description": "CREAM CHEESE"})));
        assert!(!matches(filter, json!({"Description": 42})));
    }

    #[test]
    fn test_regex_case_insensitive() {
        let filter = json!({"Description": {"$regex": "^cheese", "$options": "i"}});
        assert!(matches(filter, json!({"Description": "CHEESE, SWISS"})));
    }

    #[test]
    fn test_array_field_any_element() {
        let filter = json!({"p.Protein": {"$gt": 10}});
        assert!(matches(filter.clone(), json!({"p": [{"Protein": 4}, {"Protein": 12}]})));
        assert!(!matches(filter.clone(), json!({"p": [{"Protein": 4}]})));
        assert!(!matches(filter, json!({"p": []})));
    }

    #[test]
    fn test_missing_field_semantics() {
        assert!(matches(json!({"Calcium": null}), json!({"ID": 1})));
        assert!(matches(json!({"Calcium": {"$exists": false}}), json!({"ID": 1})));
        assert!(!matches(json!({"Calcium": {"$exists": true}}), json!({"ID": 1})));
        assert!(matches(json!({"Calcium": {"$ne": 5}}), json!({"ID": 1})));
        assert!(!matches(json!({"Calcium": {"$gt": 0}}), json!({"ID": 1})));
    }

    #[test]
    fn test_in_and_nin() {
        let filter = json!({"ID": {"$in": [1, 2, 3]}});
        assert!(matches(filter.clone(), json!({"ID": 2})));
        assert!(!matches(filter, json!({"ID": 4})));

        let filter = json!({"ID": {"$nin": [1, 2, 3]}});
        assert!(matches(filter, json!({"ID": 4})));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(matches(json!({}), json!({"anything": true})));
    }
}
