//! Value coercion shared by the expression and node evaluators.
//!
//! The schema language is dynamically typed: operands move between string,
//! number, and boolean interpretations depending on the operator. The
//! conversions here are the single source of truth for those rules.

use serde_json::Value;

/// Largest float that still maps exactly onto an integer (2^53).
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Convert a value to a number for arithmetic.
///
/// Numbers pass through, booleans convert to 1/0, strings are trimmed and
/// parsed as floats. Everything else (null, sequences, mappings) becomes
/// NaN, which downstream operators use to select their fallback branch.
pub(crate) fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Rebuild a `Value` from an arithmetic result.
///
/// `serde_json::Value` cannot carry NaN or infinities, so non-finite
/// results collapse to null — null converts back to NaN under
/// [`to_number`], which keeps NaN propagation intact across chained
/// operations. Integral results take the integer representation.
pub(crate) fn number_value(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INT {
        return Value::Number((n as i64).into());
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// The string form of a value, as emitted into generated output.
///
/// Null is empty, sequences concatenate their elements' string forms, and
/// mappings render as compact JSON. Integral floats drop the decimal point.
pub(crate) fn string_form(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(string_form).collect(),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Standard truthiness: null, false, 0, the empty string, and empty
/// sequences/mappings are falsy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Structural equality with numbers compared numerically, so `1` and `1.0`
/// are equal regardless of their JSON representation.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(p), Some(q)) => p == q,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(v, w)| values_equal(v, w))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}
