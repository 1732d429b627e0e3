//! Aggregation expressions
//!
//! An expression is evaluated against one document:
//!
//! - `"$path"` reads a field
//! - `{"$literal": v}` and any other non-`$` JSON value is a literal
//! - `{field: expr, ...}` builds an object
//! - `{"$op": [args]}` applies an operator
//!
//! Evaluation yields `None` when the value is missing, which callers use to
//! omit computed fields or skip accumulator input.

use serde_json::Value;

use crate::document::{lookup_value, Document, Numeric};
use crate::executor::{QueryError, QueryResult};

/// Expression operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    ArrayElemAt,
    Split,
    Concat,
    ToUpper,
    ToLower,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "$arrayElemAt" => Operator::ArrayElemAt,
            "$split" => Operator::Split,
            "$concat" => Operator::Concat,
            "$toUpper" => Operator::ToUpper,
            "$toLower" => Operator::ToLower,
            "$add" => Operator::Add,
            "$subtract" => Operator::Subtract,
            "$multiply" => Operator::Multiply,
            "$divide" => Operator::Divide,
            _ => return None,
        })
    }

    /// Operator name including the `$`
    pub fn name(&self) -> &'static str {
        match self {
            Operator::ArrayElemAt => "$arrayElemAt",
            Operator::Split => "$split",
            Operator::Concat => "$concat",
            Operator::ToUpper => "$toUpper",
            Operator::ToLower => "$toLower",
            Operator::Add => "$add",
            Operator::Subtract => "$subtract",
            Operator::Multiply => "$multiply",
            Operator::Divide => "$divide",
        }
    }

    /// Required argument count; None for variadic operators
    fn arity(&self) -> Option<usize> {
        match self {
            Operator::ArrayElemAt | Operator::Split | Operator::Subtract | Operator::Divide => {
                Some(2)
            }
            Operator::ToUpper | Operator::ToLower => Some(1),
            Operator::Concat | Operator::Add | Operator::Multiply => None,
        }
    }

    fn check_arity(&self, given: usize) -> QueryResult<()> {
        match self.arity() {
            Some(expected) if expected != given => Err(QueryError::validation(format!(
                "{} takes {} argument(s), got {}",
                self.name(),
                expected,
                given
            ))),
            _ => Ok(()),
        }
    }
}

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant value
    Literal(Value),
    /// Field reference without the leading `$`
    Field(String),
    /// Object whose values are expressions
    Object(Vec<(String, Expression)>),
    /// Array of expressions
    Array(Vec<Expression>),
    /// Operator application
    Apply(Operator, Vec<Expression>),
}

impl Expression {
    /// Parses an expression from JSON
    pub fn parse(value: &Value) -> QueryResult<Self> {
        match value {
            Value::String(s) => match s.strip_prefix('$') {
                Some("") => Err(QueryError::validation("'$' is not a valid field path")),
                Some(path) if path.starts_with('$') => Err(QueryError::validation(format!(
                    "variables are not supported: {}",
                    s
                ))),
                Some(path) => Ok(Expression::Field(path.to_string())),
                None => Ok(Expression::Literal(value.clone())),
            },
            Value::Array(items) => items
                .iter()
                .map(Expression::parse)
                .collect::<QueryResult<Vec<_>>>()
                .map(Expression::Array),
            Value::Object(map) => {
                let operator_keys = map.keys().filter(|k| k.starts_with('$')).count();
                if operator_keys == 0 {
                    let fields = map
                        .iter()
                        .map(|(k, v)| Ok((k.clone(), Expression::parse(v)?)))
                        .collect::<QueryResult<Vec<_>>>()?;
                    return Ok(Expression::Object(fields));
                }
                if map.len() != 1 {
                    return Err(QueryError::validation(format!(
                        "an expression object must have exactly one operator: {}",
                        value
                    )));
                }
                let Some((name, operand)) = map.iter().next() else {
                    return Err(QueryError::validation("empty expression object"));
                };
                Self::parse_operator(name, operand)
            }
            _ => Ok(Expression::Literal(value.clone())),
        }
    }

    fn parse_operator(name: &str, operand: &Value) -> QueryResult<Self> {
        if name == "$literal" {
            return Ok(Expression::Literal(operand.clone()));
        }
        let Some(op) = Operator::from_name(name) else {
            return Err(QueryError::validation(format!(
                "unknown expression operator: {}",
                name
            )));
        };

        let args = match operand {
            Value::Array(items) => items
                .iter()
                .map(Expression::parse)
                .collect::<QueryResult<Vec<_>>>()?,
            single => vec![Expression::parse(single)?],
        };
        op.check_arity(args.len())?;
        Ok(Expression::Apply(op, args))
    }

    /// Evaluates the expression. `None` means missing.
    pub fn evaluate(&self, doc: &Document) -> QueryResult<Option<Value>> {
        match self {
            Expression::Literal(v) => Ok(Some(v.clone())),
            Expression::Field(path) => Ok(lookup_value(doc, path)),
            Expression::Object(fields) => {
                let mut out = Document::new();
                for (key, expr) in fields {
                    if let Some(v) = expr.evaluate(doc)? {
                        out.insert(key.clone(), v);
                    }
                }
                Ok(Some(Value::Object(out)))
            }
            Expression::Array(items) => {
                let values = items
                    .iter()
                    .map(|e| Ok(e.evaluate(doc)?.unwrap_or(Value::Null)))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(Some(Value::Array(values)))
            }
            Expression::Apply(op, args) => {
                let values = args
                    .iter()
                    .map(|e| e.evaluate(doc))
                    .collect::<QueryResult<Vec<_>>>()?;
                apply(*op, values)
            }
        }
    }

    /// Evaluates the expression, mapping missing to null
    pub fn evaluate_or_null(&self, doc: &Document) -> QueryResult<Value> {
        Ok(self.evaluate(doc)?.unwrap_or(Value::Null))
    }
}

fn is_nullish(value: &Option<Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn apply(op: Operator, args: Vec<Option<Value>>) -> QueryResult<Option<Value>> {
    op.check_arity(args.len())?;
    match op {
        Operator::ArrayElemAt => array_elem_at(&args[0], &args[1]),
        Operator::Split => split(&args[0], &args[1]),
        Operator::Concat => concat(&args),
        Operator::ToUpper => change_case(&args[0], op, str::to_uppercase),
        Operator::ToLower => change_case(&args[0], op, str::to_lowercase),
        Operator::Add => fold_numbers(op, &args, Numeric::add),
        Operator::Multiply => fold_numbers(op, &args, Numeric::mul),
        Operator::Subtract => fold_numbers(op, &args, Numeric::sub),
        Operator::Divide => divide(&args[0], &args[1]),
    }
}

fn array_elem_at(array: &Option<Value>, index: &Option<Value>) -> QueryResult<Option<Value>> {
    if is_nullish(array) || is_nullish(index) {
        return Ok(Some(Value::Null));
    }
    let Some(Value::Array(items)) = array else {
        return Err(QueryError::type_mismatch(format!(
            "$arrayElemAt requires an array, got {}",
            array.as_ref().unwrap_or(&Value::Null)
        )));
    };
    let position = match index.as_ref().and_then(Numeric::from_value) {
        Some(Numeric::Int(i)) => i,
        Some(Numeric::Float(f)) if f.fract() == 0.0 => f as i64,
        _ => {
            return Err(QueryError::type_mismatch(
                "$arrayElemAt index must be an integer",
            ))
        }
    };

    let resolved = if position < 0 {
        items.len() as i64 + position
    } else {
        position
    };
    if resolved < 0 {
        return Ok(None);
    }
    Ok(items.get(resolved as usize).cloned())
}

fn split(text: &Option<Value>, delimiter: &Option<Value>) -> QueryResult<Option<Value>> {
    if is_nullish(text) {
        return Ok(Some(Value::Null));
    }
    let (Some(Value::String(text)), Some(Value::String(delimiter))) = (text, delimiter) else {
        return Err(QueryError::type_mismatch("$split requires string arguments"));
    };
    if delimiter.is_empty() {
        return Err(QueryError::validation("$split delimiter cannot be empty"));
    }
    let parts = text
        .split(delimiter.as_str())
        .map(|part| Value::String(part.to_string()))
        .collect();
    Ok(Some(Value::Array(parts)))
}

fn concat(args: &[Option<Value>]) -> QueryResult<Option<Value>> {
    let mut out = String::new();
    for arg in args {
        match arg {
            None | Some(Value::Null) => return Ok(Some(Value::Null)),
            Some(Value::String(s)) => out.push_str(s),
            Some(other) => {
                return Err(QueryError::type_mismatch(format!(
                    "$concat only supports strings, got {}",
                    other
                )))
            }
        }
    }
    Ok(Some(Value::String(out)))
}

fn change_case(
    arg: &Option<Value>,
    op: Operator,
    convert: fn(&str) -> String,
) -> QueryResult<Option<Value>> {
    let text = match arg {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => convert(s),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(QueryError::type_mismatch(format!(
                "{} requires a string, got {}",
                op.name(),
                other
            )))
        }
    };
    Ok(Some(Value::String(text)))
}

fn numeric_args(op: Operator, args: &[Option<Value>]) -> QueryResult<Option<Vec<Numeric>>> {
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            None | Some(Value::Null) => return Ok(None),
            Some(v) => match Numeric::from_value(v) {
                Some(n) => numbers.push(n),
                None => {
                    return Err(QueryError::type_mismatch(format!(
                        "{} only supports numeric types, got {}",
                        op.name(),
                        v
                    )))
                }
            },
        }
    }
    Ok(Some(numbers))
}

fn fold_numbers(
    op: Operator,
    args: &[Option<Value>],
    combine: fn(Numeric, Numeric) -> Numeric,
) -> QueryResult<Option<Value>> {
    let Some(numbers) = numeric_args(op, args)? else {
        return Ok(Some(Value::Null));
    };
    let mut iter = numbers.into_iter();
    let Some(first) = iter.next() else {
        let identity = if op == Operator::Multiply { 1 } else { 0 };
        return Ok(Some(Value::from(identity)));
    };
    Ok(Some(iter.fold(first, combine).to_value()))
}

fn divide(dividend: &Option<Value>, divisor: &Option<Value>) -> QueryResult<Option<Value>> {
    let args = [dividend.clone(), divisor.clone()];
    let Some(numbers) = numeric_args(Operator::Divide, &args)? else {
        return Ok(Some(Value::Null));
    };
    numbers[0]
        .div(numbers[1])
        .map(|n| Some(n.to_value()))
        .ok_or_else(|| QueryError::validation("can't $divide by zero"))
}
