//! Value ordering and equality
//!
//! One total order is shared by sort, range predicates, `$max`/`$min`,
//! distinct sorting and map-reduce key ordering, so results never depend on
//! which operation compared the values.

use std::cmp::Ordering;

use serde_json::Value;

use super::number::Numeric;

/// Rank of a value's type in the collation order
pub fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Compares two values in collation order.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Number(_), Value::Number(_)) => {
            match (Numeric::from_value(a), Numeric::from_value(b)) {
                (Some(x), Some(y)) => x.compare(&y),
                _ => Ordering::Equal,
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Object(x), Value::Object(y)) => {
            for ((ka, va), (kb, vb)) in x.iter().zip(y.iter()) {
                let ord = ka.cmp(kb).then_with(|| compare_values(va, vb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Array(x), Value::Array(y)) => {
            for (ea, eb) in x.iter().zip(y.iter()) {
                let ord = compare_values(ea, eb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Equality under collation order (`1 == 1.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Ordering::Equal
}

/// Returns a string that is identical for any two values that are
/// `values_equal`. Used as a hash key for grouping.
pub fn canonical_key(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push('n'),
        Value::Bool(b) => out.push_str(if *b { "t" } else { "f" }),
        Value::Number(_) => {
            out.push('#');
            match Numeric::from_value(value).map(Numeric::normalized) {
                Some(Numeric::Int(i)) => out.push_str(&i.to_string()),
                Some(Numeric::Float(f)) => out.push_str(&format!("{:?}", f)),
                None => out.push('?'),
            }
        }
        Value::String(s) => {
            // Debug formatting quotes and escapes, so embedded delimiters
            // cannot collide with the surrounding structure.
            out.push('s');
            out.push_str(&format!("{:?}", s));
        }
        Value::Array(items) => {
            out.push('[');
            for item in items {
                write_canonical(item, out);
                out.push(',');
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (k, v) in map {
                out.push_str(&format!("{:?}", k));
                out.push(':');
                write_canonical(v, out);
                out.push(',');
            }
            out.push('}');
        }
    }
}
