//! Numeric arithmetic over JSON numbers
//!
//! Integer arithmetic stays integral until it overflows or meets a float.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// A JSON number split into its integer or float representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    /// Signed 64-bit integer
    Int(i64),
    /// Double precision float
    Float(f64),
}

impl Numeric {
    /// Extracts a number from a JSON value.
    ///
    /// Returns None for every non-number value.
    pub fn from_value(value: &Value) -> Option<Self> {
        let Value::Number(n) = value else {
            return None;
        };

        if let Some(i) = n.as_i64() {
            Some(Numeric::Int(i))
        } else {
            n.as_f64().map(Numeric::Float)
        }
    }

    /// Returns the value as f64
    pub fn as_f64(&self) -> f64 {
        match self {
            Numeric::Int(i) => *i as f64,
            Numeric::Float(f) => *f,
        }
    }

    /// Adds two numbers, staying integral when both are integers.
    pub fn add(self, other: Numeric) -> Numeric {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => match a.checked_add(b) {
                Some(sum) => Numeric::Int(sum),
                None => Numeric::Float(a as f64 + b as f64),
            },
            (a, b) => Numeric::Float(a.as_f64() + b.as_f64()),
        }
    }

    /// Subtracts `other` from self.
    pub fn sub(self, other: Numeric) -> Numeric {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => match a.checked_sub(b) {
                Some(diff) => Numeric::Int(diff),
                None => Numeric::Float(a as f64 - b as f64),
            },
            (a, b) => Numeric::Float(a.as_f64() - b.as_f64()),
        }
    }

    /// Multiplies two numbers.
    pub fn mul(self, other: Numeric) -> Numeric {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => match a.checked_mul(b) {
                Some(product) => Numeric::Int(product),
                None => Numeric::Float(a as f64 * b as f64),
            },
            (a, b) => Numeric::Float(a.as_f64() * b.as_f64()),
        }
    }

    /// Divides self by `other`. Always produces a float.
    ///
    /// Returns None on division by zero.
    pub fn div(self, other: Numeric) -> Option<Numeric> {
        let divisor = other.as_f64();
        if divisor == 0.0 {
            return None;
        }
        Some(Numeric::Float(self.as_f64() / divisor))
    }

    /// Numeric comparison across representations.
    ///
    /// Integers and floats compare by exact value, so equality is transitive
    /// even where an i64 has no exact f64 form.
    pub fn compare(&self, other: &Numeric) -> Ordering {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a.cmp(b),
            (Numeric::Int(a), Numeric::Float(b)) => compare_int_float(*a, *b),
            (Numeric::Float(a), Numeric::Int(b)) => compare_int_float(*b, *a).reverse(),
            (Numeric::Float(a), Numeric::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        }
    }

    /// Collapses a float holding an exact i64 value into `Int`.
    ///
    /// Two numbers compare equal exactly when their normalized forms are
    /// identical, which makes this the key for hashing and indexing.
    pub fn normalized(self) -> Numeric {
        match self {
            Numeric::Float(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f) => {
                Numeric::Int(f as i64)
            }
            other => other,
        }
    }

    /// Converts back to a JSON value.
    ///
    /// Non-finite floats have no JSON encoding and become null.
    pub fn to_value(self) -> Value {
        match self {
            Numeric::Int(i) => Value::Number(i.into()),
            Numeric::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        }
    }
}

/// 2^63, the first float above every i64
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn compare_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return Ordering::Equal;
    }
    if f >= I64_BOUND {
        return Ordering::Less;
    }
    if f < -I64_BOUND {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => whole.partial_cmp(&f).unwrap_or(Ordering::Equal),
        ord => ord,
    }
}
