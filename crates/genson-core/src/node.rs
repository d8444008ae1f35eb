//! Node evaluator: tag dispatch and string emission.
//!
//! Every node evaluation enters a sibling frame (recursion counter
//! advanced, scope storage shared) and dispatches on the canonical tag.
//! Malformed nodes degrade to the empty string; only recursion exhaustion
//! and orphan parent writes are errors.

use serde_json::{Map, Value};

use crate::coerce::{string_form, to_number};
use crate::context::Context;
use crate::error::EvalError;
use crate::expr::{evaluate_call, evaluate_expr};
use crate::path::path_string;
use crate::select::{uniform_choice, weighted_choice};

/// Evaluate a node to its generated string.
pub fn evaluate_node(node: &Value, ctx: &Context) -> Result<String, EvalError> {
    let frame = ctx.enter()?;
    match node {
        Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(string_form(node)),
        Value::Array(items) => {
            let mut out = String::new();
            for item in items {
                out.push_str(&evaluate_node(item, &frame)?);
            }
            Ok(out)
        }
        Value::Object(obj) => evaluate_tagged(obj, &frame),
    }
}

/// Canonicalize a node tag, folding the historical aliases.
fn canonical_tag(tag: &str) -> &str {
    match tag {
        "seq" => "sequence",
        "Roulette" => "roulette",
        "repeat" => "repetition",
        "expr" => "expression",
        "var" => "ref",
        other => other,
    }
}

fn evaluate_tagged(obj: &Map<String, Value>, ctx: &Context) -> Result<String, EvalError> {
    let tag = canonical_tag(obj.get("type").and_then(Value::as_str).unwrap_or(""));
    tracing::trace!(tag, "evaluating node");
    match tag {
        "text" => Ok(obj.get("text").map(string_form).unwrap_or_default()),
        "sequence" => {
            let mut out = String::new();
            if let Some(items) = obj.get("items").and_then(Value::as_array) {
                for item in items {
                    out.push_str(&evaluate_node(item, ctx)?);
                }
            }
            Ok(out)
        }
        "option" => {
            let items = items_slice(obj);
            match uniform_choice(ctx, items) {
                Some(pick) => evaluate_node(pick, ctx),
                None => Ok(String::new()),
            }
        }
        "roulette" => {
            let items = items_slice(obj);
            match weighted_choice(ctx, items)? {
                Some(pick) => evaluate_node(roulette_value(pick), ctx),
                None => Ok(String::new()),
            }
        }
        "repetition" => evaluate_repetition(obj, ctx),
        "delegate" => evaluate_delegate(obj, ctx),
        "layer" => evaluate_layer(obj, ctx),
        "module" => evaluate_module(obj, ctx),
        "vec" => {
            let mut out = Vec::new();
            if let Some(items) = obj.get("items").and_then(Value::as_array) {
                for item in items {
                    out.push(evaluate_expr(item, ctx)?);
                }
            }
            Ok(string_form(&Value::Array(out)))
        }
        "ref" => evaluate_ref(obj, ctx),
        "expression" => {
            let inner = obj.get("value").or_else(|| obj.get("expr"));
            match inner {
                Some(expr) => Ok(string_form(&evaluate_expr(expr, ctx)?)),
                None => Ok(String::new()),
            }
        }
        "call" => Ok(string_form(&evaluate_call(obj, ctx)?)),
        "set" => evaluate_set(obj, ctx),
        "effect" => evaluate_effect(obj, ctx),
        other => {
            tracing::trace!(tag = other, "unknown node tag");
            Ok(String::new())
        }
    }
}

fn items_slice(obj: &Map<String, Value>) -> &[Value] {
    obj.get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// A roulette item either wraps its payload under `value` or IS the
/// payload.
fn roulette_value(item: &Value) -> &Value {
    item.get("value").unwrap_or(item)
}

/// `repetition`: a fixed count (raw integer or expression), a payload, and
/// an optional separator. The count is clamped to the iteration ceiling.
fn evaluate_repetition(obj: &Map<String, Value>, ctx: &Context) -> Result<String, EvalError> {
    let target = match obj.get("times").or_else(|| obj.get("time")) {
        Some(count) => to_number(&evaluate_expr(count, ctx)?),
        None => 0.0,
    };
    let mut times = if target.is_finite() && target > 0.0 {
        target as usize
    } else {
        0
    };
    let cap = ctx.limits().max_iterations;
    if times > cap {
        tracing::debug!(times, cap, "repetition count clamped to the iteration ceiling");
        times = cap;
    }

    let payload = obj.get("value").or_else(|| obj.get("items"));
    let mut parts = Vec::with_capacity(times);
    for _ in 0..times {
        parts.push(match payload {
            Some(node) => evaluate_node(node, ctx)?,
            None => String::new(),
        });
    }
    let separator = match obj.get("separator") {
        Some(sep) => evaluate_node(sep, ctx)?,
        None => String::new(),
    };
    Ok(parts.join(&separator))
}

/// `delegate`: the count target (`weight`, fallback `times`/`time`) is an
/// expression re-evaluated every iteration in a child frame holding the
/// 1-based index. The loop stops when the target is NaN, drops to zero or
/// below, or the iteration exceeds it; the ceiling cuts it short silently.
fn evaluate_delegate(obj: &Map<String, Value>, ctx: &Context) -> Result<String, EvalError> {
    let target_expr = obj
        .get("weight")
        .or_else(|| obj.get("times"))
        .or_else(|| obj.get("time"));
    let index_name = obj.get("index").and_then(Value::as_str).unwrap_or("i");
    let payload = obj.get("value").or_else(|| obj.get("items"));
    let cap = ctx.limits().max_iterations;

    let mut parts = Vec::new();
    for i in 1usize.. {
        if i > cap {
            tracing::debug!(cap, "delegate hit the iteration ceiling");
            break;
        }
        let frame = ctx.child();
        frame.define_local(index_name, Value::from(i as i64));
        let target = match target_expr {
            Some(expr) => to_number(&evaluate_expr(expr, &frame)?),
            None => f64::NAN,
        };
        if target.is_nan() || target <= 0.0 || (i as f64) > target {
            break;
        }
        parts.push(match payload {
            Some(node) => evaluate_node(node, &frame)?,
            None => String::new(),
        });
    }
    // Separator belongs to the outer context, not the loop frame.
    let separator = match obj.get("separator") {
        Some(sep) => evaluate_node(sep, ctx)?,
        None => String::new(),
    };
    Ok(parts.join(&separator))
}

/// `layer`: child frame seeded from props, declarations registered, before
/// hooks run, then the items evaluate — a sequence as a weighted pick with
/// implicit weight 1 (uniform roulette), a mapping as one node.
fn evaluate_layer(obj: &Map<String, Value>, ctx: &Context) -> Result<String, EvalError> {
    let frame = ctx.child();

    if let Some(props) = obj
        .get("prop")
        .or_else(|| obj.get("props"))
        .and_then(Value::as_object)
    {
        for (name, prop) in props {
            let seeded = prop.get("value").cloned().unwrap_or_else(|| prop.clone());
            frame.define_local(name, seeded);
        }
    }

    match obj.get("decl").or_else(|| obj.get("decls")) {
        Some(Value::Array(decls)) => {
            for decl in decls {
                if let Some(name) = decl.get("name").and_then(Value::as_str) {
                    frame.declare(name, decl.clone());
                }
            }
        }
        Some(Value::Object(decls)) => {
            for (name, decl) in decls {
                frame.declare(name, decl.clone());
            }
        }
        _ => {}
    }

    if let Some(hooks) = obj.get("before").and_then(Value::as_array) {
        for hook in hooks {
            match hook.get("type").and_then(Value::as_str) {
                Some("set") | Some("effect") => {
                    evaluate_node(hook, &frame)?;
                }
                _ => {}
            }
        }
    }

    match obj.get("items") {
        Some(Value::Array(items)) => match weighted_choice(&frame, items)? {
            Some(pick) => evaluate_node(roulette_value(pick), &frame),
            None => Ok(String::new()),
        },
        Some(Value::Null) | None => Ok(String::new()),
        Some(single) => evaluate_node(single, &frame),
    }
}

/// `module`: `$N` defaults index into the items, any other present default
/// evaluates directly, and no default at all joins every item with a
/// newline.
fn evaluate_module(obj: &Map<String, Value>, ctx: &Context) -> Result<String, EvalError> {
    let items = items_slice(obj);

    if let Some(Value::String(default)) = obj.get("default") {
        if let Some(digits) = default.strip_prefix('$') {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return match digits.parse::<usize>().ok().and_then(|i| items.get(i)) {
                    Some(item) => evaluate_node(item, ctx),
                    None => Ok(String::new()),
                };
            }
        }
    }
    if let Some(default) = obj.get("default") {
        if !default.is_null() {
            return evaluate_node(default, ctx);
        }
    }

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        lines.push(evaluate_node(item, ctx)?);
    }
    Ok(lines.join("\n"))
}

/// `ref`: resolve the path; null falls back to the `else` node. A resolved
/// mapping carrying a `type` is a node and evaluates recursively.
fn evaluate_ref(obj: &Map<String, Value>, ctx: &Context) -> Result<String, EvalError> {
    let resolved = match obj
        .get("to")
        .or_else(|| obj.get("path"))
        .or_else(|| obj.get("value"))
    {
        Some(path) => ctx.get_path(&path_string(path)),
        None => Value::Null,
    };

    if resolved.is_null() {
        return match obj.get("else") {
            Some(fallback) => evaluate_node(fallback, ctx),
            None => Ok(String::new()),
        };
    }
    if resolved.get("type").is_some() {
        return evaluate_node(&resolved, ctx);
    }
    Ok(string_form(&resolved))
}

/// `set`: evaluate the value expression and write it at the path. Emits
/// nothing.
fn evaluate_set(obj: &Map<String, Value>, ctx: &Context) -> Result<String, EvalError> {
    let Some(path) = obj.get("path") else {
        return Ok(String::new());
    };
    let value = match obj.get("value") {
        Some(expr) => evaluate_expr(expr, ctx)?,
        None => Value::Null,
    };
    ctx.set_path(&path_string(path), value)?;
    Ok(String::new())
}

/// `effect`: apply the contained sets (and nested effects) for their
/// writes only. Emits nothing.
fn evaluate_effect(obj: &Map<String, Value>, ctx: &Context) -> Result<String, EvalError> {
    if let Some(items) = obj.get("items").and_then(Value::as_array) {
        for item in items {
            let Some(inner) = item.as_object() else {
                continue;
            };
            match inner.get("type").and_then(Value::as_str) {
                Some("set") => {
                    evaluate_set(inner, ctx)?;
                }
                Some("effect") => {
                    evaluate_effect(inner, ctx)?;
                }
                _ => {}
            }
        }
    }
    Ok(String::new())
}

// ===========================================================================
// Tests
// ===========================================================================
