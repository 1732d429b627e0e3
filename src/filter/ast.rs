//! Parsed filter representation

use regex::Regex;
use serde_json::Value;

/// A single operator applied to the values found at a field path
#[derive(Debug, Clone)]
pub enum Condition {
    /// `$eq` or a bare literal
    Eq(Value),
    /// `$ne`
    Ne(Value),
    /// `$gt`
    Gt(Value),
    /// `$gte`
    Gte(Value),
    /// `$lt`
    Lt(Value),
    /// `$lte`
    Lte(Value),
    /// `$in`
    In(Vec<Value>),
    /// `$nin`
    Nin(Vec<Value>),
    /// `$exists`
    Exists(bool),
    /// `$regex` with its compiled pattern
    Regex(Regex),
}

/// A validated filter tree
#[derive(Debug, Clone)]
pub enum Filter {
    /// Every child must match. An empty list matches everything.
    And(Vec<Filter>),
    /// At least one child must match
    Or(Vec<Filter>),
    /// No child may match
    Nor(Vec<Filter>),
    /// All conditions must hold for the values at `path`
    Field {
        /// Dotted field path
        path: String,
        /// Conditions combined with AND
        conditions: Vec<Condition>,
    },
}

impl Filter {
    /// A filter that matches every document
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    /// Equality on a field
    pub fn eq(path: impl Into<String>, value: Value) -> Self {
        Self::field(path, Condition::Eq(value))
    }

    /// Strictly greater than
    pub fn gt(path: impl Into<String>, value: Value) -> Self {
        Self::field(path, Condition::Gt(value))
    }

    /// Single condition on a field
    pub fn field(path: impl Into<String>, condition: Condition) -> Self {
        Filter::Field {
            path: path.into(),
            conditions: vec![condition],
        }
    }

    /// Conjunction of filters
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Disjunction of filters
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    /// Returns true if this filter matches every document
    pub fn is_match_all(&self) -> bool {
        matches!(self, Filter::And(children) if children.iter().all(Filter::is_match_all))
    }

    /// Returns the literal of a top-level equality on `path`, if any.
    ///
    /// Only equalities that every matching document must satisfy are
    /// returned, so the value can drive an index lookup.
    pub fn required_equality(&self, path: &str) -> Option<&Value> {
        match self {
            Filter::Field {
                path: field,
                conditions,
            } if field == path => conditions.iter().find_map(|c| match c {
                Condition::Eq(v) if !v.is_array() && !v.is_object() && !v.is_null() => Some(v),
                _ => None,
            }),
            Filter::And(children) => children.iter().find_map(|c| c.required_equality(path)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_is_match_all() {
        assert!(Filter::all().is_match_all());
        assert!(!Filter::eq("ID", json!(1)).is_match_all());
    }

    #[test]
    fn test_required_equality_through_and() {
        let filter = Filter::and(vec![
            Filter::gt("Calories", json!(100)),
            Filter::eq("ID", json!(93601)),
        ]);
        assert_eq!(filter.required_equality("ID"), Some(&json!(93601)));
        assert_eq!(filter.required_equality("Calories"), None);
    }

    #[test]
    fn test_or_has_no_required_equality() {
        let filter = Filter::or(vec![
            Filter::eq("ID", json!(1)),
            Filter::eq("ID", json!(2)),
        ]);
        assert_eq!(filter.required_equality("ID"), None);
    }
}
