//! Expression evaluator.
//!
//! An expression is any `Value`. Primitives are themselves, sequences
//! concatenate their elements' string forms, and mappings dispatch on
//! their `type` or `op` field. Expressions and nodes interleave: the match
//! operators evaluate their selected branch as a node, and `expression`
//! nodes call back in here.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::coerce::{is_truthy, number_value, string_form, to_number, values_equal};
use crate::context::Context;
use crate::error::EvalError;
use crate::matcher::invoke_match;
use crate::path::path_string;

/// Evaluate an expression to a runtime value.
pub fn evaluate_expr(expr: &Value, ctx: &Context) -> Result<Value, EvalError> {
    match expr {
        Value::Null => Ok(Value::String(String::new())),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(expr.clone()),
        Value::Array(items) => {
            let mut out = String::new();
            for item in items {
                out.push_str(&string_form(&evaluate_expr(item, ctx)?));
            }
            Ok(Value::String(out))
        }
        Value::Object(obj) => evaluate_mapping(obj, ctx),
    }
}

fn evaluate_mapping(obj: &Map<String, Value>, ctx: &Context) -> Result<Value, EvalError> {
    match obj.get("type").and_then(Value::as_str) {
        Some("expr") | Some("expression") => {
            return match obj.get("value").or_else(|| obj.get("expr")) {
                Some(inner) => evaluate_expr(inner, ctx),
                None => Ok(Value::String(String::new())),
            };
        }
        Some("ref") | Some("var") => return Ok(resolve_ref(obj, ctx)),
        Some("call") => return evaluate_call(obj, ctx),
        Some("vec") => {
            let mut out = Vec::new();
            if let Some(items) = obj.get("items").and_then(Value::as_array) {
                for item in items {
                    out.push(evaluate_expr(item, ctx)?);
                }
            }
            return Ok(Value::Array(out));
        }
        _ => {}
    }

    if let Some(op) = obj.get("op").and_then(Value::as_str) {
        return apply_op(op, obj, ctx);
    }

    // Compact form: {"expr": ["ref", path]} or {"expr": [left, op, right]}
    if let Some(compact) = obj.get("expr").and_then(Value::as_array) {
        return evaluate_compact(compact, ctx);
    }

    Ok(Value::String(String::new()))
}

/// Resolve a reference mapping through the scope chain. The path lives
/// under `to`, `path`, or `value`.
fn resolve_ref(obj: &Map<String, Value>, ctx: &Context) -> Value {
    match obj
        .get("to")
        .or_else(|| obj.get("path"))
        .or_else(|| obj.get("value"))
    {
        Some(path) => ctx.get_path(&path_string(path)),
        None => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn apply_op(op: &str, obj: &Map<String, Value>, ctx: &Context) -> Result<Value, EvalError> {
    match op {
        "get" => {
            let path = obj.get("path").or_else(|| obj.get("value"));
            Ok(match path {
                Some(p) => ctx.get_path(&path_string(p)),
                None => Value::Null,
            })
        }
        "+" => {
            let left = operand(obj, "left", ctx)?;
            let right = operand(obj, "right", ctx)?;
            let (ln, rn) = (to_number(&left), to_number(&right));
            if ln.is_finite() && rn.is_finite() {
                Ok(number_value(ln + rn))
            } else {
                Ok(Value::String(format!(
                    "{}{}",
                    string_form(&left),
                    string_form(&right)
                )))
            }
        }
        "-" | "*" | "/" | "%" => {
            let ln = to_number(&operand(obj, "left", ctx)?);
            let rn = to_number(&operand(obj, "right", ctx)?);
            let result = match op {
                "-" => ln - rn,
                "*" => ln * rn,
                // Division and modulo by zero yield NaN, not an error.
                "/" => {
                    if rn == 0.0 {
                        f64::NAN
                    } else {
                        ln / rn
                    }
                }
                _ => {
                    if rn == 0.0 {
                        f64::NAN
                    } else {
                        ln % rn
                    }
                }
            };
            Ok(number_value(result))
        }
        ">" | "<" | ">=" | "<=" => {
            let left = operand(obj, "left", ctx)?;
            let right = operand(obj, "right", ctx)?;
            Ok(Value::Bool(compare(op, &left, &right)))
        }
        "==" => {
            let left = operand(obj, "left", ctx)?;
            let right = operand(obj, "right", ctx)?;
            Ok(Value::Bool(values_equal(&left, &right)))
        }
        "!=" => {
            let left = operand(obj, "left", ctx)?;
            let right = operand(obj, "right", ctx)?;
            Ok(Value::Bool(!values_equal(&left, &right)))
        }
        "and" => {
            if !is_truthy(&operand(obj, "left", ctx)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(is_truthy(&operand(obj, "right", ctx)?)))
        }
        "or" => {
            if is_truthy(&operand(obj, "left", ctx)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(is_truthy(&operand(obj, "right", ctx)?)))
        }
        "not" => {
            let inner = match obj.get("value").or_else(|| obj.get("left")) {
                Some(v) => evaluate_expr(v, ctx)?,
                None => Value::Null,
            };
            Ok(Value::Bool(!is_truthy(&inner)))
        }
        "?:" => {
            let cond = operand(obj, "cond", ctx)?;
            let branch = if is_truthy(&cond) {
                obj.get("then")
            } else {
                obj.get("else")
            };
            match branch {
                Some(b) => evaluate_expr(b, ctx),
                None => Ok(Value::String(String::new())),
            }
        }
        "|" => pipe_match(obj, ctx),
        "match" | "match_mut" => method_match(obj, ctx),
        other => {
            tracing::trace!(op = other, "unknown operator");
            Ok(Value::String(String::new()))
        }
    }
}

/// Evaluate the named operand field, treating a missing field as null.
fn operand(obj: &Map<String, Value>, field: &str, ctx: &Context) -> Result<Value, EvalError> {
    match obj.get(field) {
        Some(value) => evaluate_expr(value, ctx),
        None => Ok(Value::String(String::new())),
    }
}

/// Relational comparison: numeric when both evaluated operands ARE finite
/// numbers, lexicographic over string forms otherwise (so `"10" < "9"`).
fn compare(op: &str, left: &Value, right: &Value) -> bool {
    let ordering = match (as_finite_number(left), as_finite_number(right)) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => Some(string_form(left).cmp(&string_form(right))),
    };
    match (op, ordering) {
        (_, None) => false,
        (">", Some(ord)) => ord == Ordering::Greater,
        ("<", Some(ord)) => ord == Ordering::Less,
        (">=", Some(ord)) => ord != Ordering::Less,
        ("<=", Some(ord)) => ord != Ordering::Greater,
        _ => false,
    }
}

fn as_finite_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Match operators
// ---------------------------------------------------------------------------

/// `left | [name, extra...]` — prepend the piped value to the args and
/// invoke the named Match. A non-sequence right side is the bare name.
fn pipe_match(obj: &Map<String, Value>, ctx: &Context) -> Result<Value, EvalError> {
    let instance = operand(obj, "left", ctx)?;
    let (name, extra): (String, &[Value]) = match obj.get("right") {
        Some(Value::Array(seq)) => match seq.split_first() {
            Some((head, rest)) => (path_string(head), rest),
            None => return Ok(Value::Null),
        },
        Some(other) => (path_string(other), &[]),
        None => return Ok(Value::Null),
    };

    let mut args = vec![instance];
    for arg in extra {
        args.push(evaluate_expr(arg, ctx)?);
    }
    invoke_match(ctx, &name, &args)
}

/// `{op: "match", left, right, args}` — the matcher name comes from
/// `right`, extra args from `args`, and the instance is `left`.
fn method_match(obj: &Map<String, Value>, ctx: &Context) -> Result<Value, EvalError> {
    let instance = operand(obj, "left", ctx)?;
    let name = match obj.get("right") {
        Some(right) => path_string(right),
        None => return Ok(Value::Null),
    };

    let mut args = vec![instance];
    if let Some(extra) = obj.get("args").and_then(Value::as_array) {
        for arg in extra {
            args.push(evaluate_expr(arg, ctx)?);
        }
    }
    invoke_match(ctx, &name, &args)
}

// ---------------------------------------------------------------------------
// Compact form
// ---------------------------------------------------------------------------

/// `["ref"/"var", path]` resolves a path; `[left, op, right]` applies the
/// operator with the outer fields rebuilt.
fn evaluate_compact(items: &[Value], ctx: &Context) -> Result<Value, EvalError> {
    match items {
        [sym, arg] if matches!(sym.as_str(), Some("ref") | Some("var")) => {
            Ok(ctx.get_path(&path_string(arg)))
        }
        [left, op, right] => match op.as_str() {
            Some(op) => {
                let mut rebuilt = Map::new();
                rebuilt.insert("left".to_string(), left.clone());
                rebuilt.insert("right".to_string(), right.clone());
                apply_op(op, &rebuilt, ctx)
            }
            None => Ok(Value::String(String::new())),
        },
        _ => Ok(Value::String(String::new())),
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Evaluate a call mapping: `{ type: 'call', path, args }`. Args are
/// evaluated as expressions; unknown call targets yield the empty string.
pub(crate) fn evaluate_call(obj: &Map<String, Value>, ctx: &Context) -> Result<Value, EvalError> {
    let path = obj.get("path").map(path_string).unwrap_or_default();
    let mut args = Vec::new();
    if let Some(list) = obj.get("args").and_then(Value::as_array) {
        for arg in list {
            args.push(evaluate_expr(arg, ctx)?);
        }
    }

    match path.as_str() {
        "rand_int" | "randint" => Ok(rand_int(ctx, &args)),
        other => {
            tracing::trace!(path = other, "unknown call target");
            Ok(Value::String(String::new()))
        }
    }
}

/// Uniform integer in `[a, b]` (bounds swapped if reversed); non-numeric
/// bounds yield null.
fn rand_int(ctx: &Context, args: &[Value]) -> Value {
    let a = to_number(args.first().unwrap_or(&Value::Null));
    let b = to_number(args.get(1).unwrap_or(&Value::Null));
    if !a.is_finite() || !b.is_finite() {
        return Value::Null;
    }
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let (lo, hi) = (lo.floor() as i64, hi.floor() as i64);
    let span = (hi - lo + 1) as f64;
    let offset = (ctx.next_f64() * span) as i64;
    Value::Number((lo + offset.min(hi - lo)).into())
}

// ===========================================================================
// Tests
// ===========================================================================
