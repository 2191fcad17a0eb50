//! Rule conditions and their evaluation against a record

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Condition comparison operators
///
/// Unrecognised operator strings deserialize as `Unknown` so a stored rule
/// still loads; an unknown operator never matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    In,
    NotIn,
    #[serde(other)]
    Unknown,
}

impl ConditionOperator {
    /// Evaluate the operator for a field value against the condition value
    pub fn evaluate(&self, field_value: &Value, compare_value: &Value) -> bool {
        match self {
            Self::Equals => values_equal(field_value, compare_value),
            Self::NotEquals => !values_equal(field_value, compare_value),
            Self::Contains => value_to_string(field_value).contains(&value_to_string(compare_value)),
            Self::GreaterThan => compare_numbers(field_value, compare_value, |a, b| a > b),
            Self::LessThan => compare_numbers(field_value, compare_value, |a, b| a < b),
            Self::In => is_member(field_value, compare_value),
            Self::NotIn => !is_member(field_value, compare_value),
            Self::Unknown => false,
        }
    }
}

/// A single `field operator value` test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    /// Field name, dot paths reach into nested objects
    pub field: String,

    pub operator: ConditionOperator,

    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Evaluate against a record; a missing field compares as `null`
    pub fn matches(&self, record: &Value) -> bool {
        let field_value = get_nested_field(record, &self.field).unwrap_or(&Value::Null);
        self.operator.evaluate(field_value, &self.value)
    }
}

/// Evaluate a conjunction of conditions. An empty list is vacuously true.
pub fn evaluate(conditions: &[Condition], record: &Value) -> bool {
    conditions.iter().all(|c| c.matches(record))
}

/// Numeric view of a value: numbers, numeric strings and booleans (0/1)
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn compare_numbers<F>(a: &Value, b: &Value, f: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (coerce_number(a), coerce_number(b)) {
        (Some(a), Some(b)) => f(a, b),
        _ => false,
    }
}

/// Type-strict equality where numbers compare by value, so `25000 == 25000.0` but `"1" != 1`
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn is_member(field: &Value, candidates: &Value) -> bool {
    match candidates {
        Value::Array(items) => items.iter().any(|item| values_equal(field, item)),
        _ => false,
    }
}

fn get_nested_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        match current {
            Value::Object(obj) => current = obj.get(part)?,
            Value::Array(arr) => current = arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        }
    }

    Some(current)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
