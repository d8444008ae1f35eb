//! Match and Domain declarations: lookup, membership tests, and branch
//! selection.
//!
//! Declarations are registered by `layer` nodes and found by walking the
//! context chain outward. A Domain maps a number to a label via ranges; a
//! Match is a dispatch table whose branches fire on positional-argument
//! predicates (domain membership or expressions).

use serde_json::Value;

use crate::coerce::{is_truthy, to_number, values_equal};
use crate::context::Context;
use crate::error::EvalError;
use crate::expr::evaluate_expr;
use crate::node::evaluate_node;

/// Test a value against a domain declaration, returning the label of the
/// first branch whose range covers it. Non-numeric values yield `None`.
pub(crate) fn domain_test(domain: &Value, value: &Value) -> Option<Value> {
    let v = to_number(value);
    if !v.is_finite() {
        return None;
    }
    let branches = domain.get("branch")?.as_array()?;
    for branch in branches {
        let Some(range) = branch.get("range") else {
            continue;
        };
        if range_covers(range, v) {
            return Some(branch.get("string").cloned().unwrap_or(Value::Null));
        }
    }
    None
}

/// A range is a single number, or a sequence mixing exact numbers and
/// two-element `[lo, hi]` bounds.
fn range_covers(range: &Value, v: f64) -> bool {
    match range {
        Value::Number(_) => to_number(range) == v,
        Value::Array(entries) => entries.iter().any(|entry| match entry {
            Value::Number(_) => to_number(entry) == v,
            Value::Array(pair) if pair.len() == 2 => {
                let lo = to_number(&pair[0]);
                let hi = to_number(&pair[1]);
                lo <= v && v <= hi
            }
            _ => false,
        }),
        _ => false,
    }
}

/// Invoke the named Match with positional args: the first branch whose
/// requirements all hold supplies a `to` node, which is evaluated and
/// returned as a string value. No declaration or no matching branch
/// yields null.
pub(crate) fn invoke_match(ctx: &Context, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let Some(decl) = ctx.lookup_decl(name, "match") else {
        tracing::debug!(name, "no match declaration in scope chain");
        return Ok(Value::Null);
    };
    match select_branch(ctx, &decl, args)? {
        Some(branch) => evaluate_node(&branch, ctx).map(Value::String),
        None => Ok(Value::Null),
    }
}

fn select_branch(
    ctx: &Context,
    decl: &Value,
    args: &[Value],
) -> Result<Option<Value>, EvalError> {
    let Some(branches) = decl.get("branch").and_then(Value::as_array) else {
        return Ok(None);
    };
    for branch in branches {
        if branch_matches(ctx, branch, args)? {
            return Ok(branch.get("to").cloned());
        }
    }
    Ok(None)
}

/// All requirements must hold, one per positional arg; missing args are
/// null. A branch with no `req` list always matches.
fn branch_matches(ctx: &Context, branch: &Value, args: &[Value]) -> Result<bool, EvalError> {
    let reqs = match branch.get("req").and_then(Value::as_array) {
        Some(reqs) => reqs,
        None => return Ok(true),
    };
    for (i, req) in reqs.iter().enumerate() {
        let arg = args.get(i).cloned().unwrap_or(Value::Null);
        if !requirement_holds(ctx, req, &arg)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn requirement_holds(ctx: &Context, req: &Value, arg: &Value) -> Result<bool, EvalError> {
    if let Some(domain_name) = req.get("domain").and_then(Value::as_str) {
        let Some(domain) = ctx.lookup_decl(domain_name, "domain") else {
            tracing::debug!(domain = domain_name, "no domain declaration in scope chain");
            return Ok(false);
        };
        return Ok(domain_test(&domain, arg).is_some());
    }
    if let Some(expr) = req.get("expr") {
        // The requirement expression sees the arg under `_arg`.
        let frame = ctx.child();
        frame.define_local("_arg", arg.clone());
        if let Some(items) = expr.as_array() {
            if items.first().and_then(Value::as_str) == Some("eq") {
                let expected = match items.get(1) {
                    Some(e) => evaluate_expr(e, &frame)?,
                    None => Value::Null,
                };
                return Ok(values_equal(arg, &expected));
            }
        }
        return Ok(is_truthy(&evaluate_expr(expr, &frame)?));
    }
    // No domain, no expr — the requirement always matches.
    Ok(true)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalOptions;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx() -> Context {
        Context::root(&EvalOptions::default())
    }

    fn size_domain() -> Value {
        json!({
            "type": "domain",
            "branch": [
                { "range": 0, "string": "none" },
                { "range": [[1, 3]], "string": "few" },
                { "range": [4, 5, [6, 10]], "string": "many" }
            ]
        })
    }

    // --- domains ---

    #[test]
    fn test_domain_single_number_range() {
        assert_eq!(domain_test(&size_domain(), &json!(0)), Some(json!("none")));
    }

    #[test]
    fn test_domain_bounds_are_inclusive() {
        let domain = size_domain();
        assert_eq!(domain_test(&domain, &json!(1)), Some(json!("few")));
        assert_eq!(domain_test(&domain, &json!(3)), Some(json!("few")));
        assert_eq!(domain_test(&domain, &json!(6)), Some(json!("many")));
        assert_eq!(domain_test(&domain, &json!(10)), Some(json!("many")));
    }

    #[test]
    fn test_domain_mixes_numbers_and_pairs() {
        assert_eq!(domain_test(&size_domain(), &json!(5)), Some(json!("many")));
    }

    #[test]
    fn test_domain_miss_and_non_numeric() {
        let domain = size_domain();
        assert_eq!(domain_test(&domain, &json!(99)), None);
        assert_eq!(domain_test(&domain, &json!("pony")), None);
        assert_eq!(domain_test(&domain, &Value::Null), None);
    }

    #[test]
    fn test_domain_accepts_numeric_strings() {
        assert_eq!(domain_test(&size_domain(), &json!("2")), Some(json!("few")));
    }

    // --- matches ---

    fn crowd_match() -> Value {
        json!({
            "type": "match",
            "branch": [
                {
                    "req": [{ "domain": "size" }],
                    "to": { "type": "text", "text": "a crowd" }
                },
                {
                    "req": [{ "expr": ["eq", "empty"] }],
                    "to": { "type": "text", "text": "nobody" }
                },
                {
                    "req": [{}],
                    "to": { "type": "text", "text": "something else" }
                }
            ]
        })
    }

    fn declared_ctx() -> Context {
        let ctx = ctx();
        ctx.declare("size", size_domain());
        ctx.declare("crowd", crowd_match());
        ctx
    }

    #[test]
    fn test_match_via_domain_requirement() {
        let ctx = declared_ctx();
        let out = invoke_match(&ctx, "crowd", &[json!(2)]).unwrap();
        assert_eq!(out, json!("a crowd"));
    }

    #[test]
    fn test_match_via_eq_expression() {
        let ctx = declared_ctx();
        let out = invoke_match(&ctx, "crowd", &[json!("empty")]).unwrap();
        assert_eq!(out, json!("nobody"));
    }

    #[test]
    fn test_match_falls_through_to_unconditional_branch() {
        let ctx = declared_ctx();
        let out = invoke_match(&ctx, "crowd", &[json!("whatever")]).unwrap();
        assert_eq!(out, json!("something else"));
    }

    #[test]
    fn test_match_unknown_name_is_null() {
        let ctx = declared_ctx();
        assert_eq!(invoke_match(&ctx, "missing", &[json!(1)]).unwrap(), Value::Null);
    }

    #[test]
    fn test_match_no_branch_is_null() {
        let ctx = ctx();
        ctx.declare("m", json!({"type": "match", "branch": [
            { "req": [{ "expr": ["eq", "exact"] }], "to": {"type": "text", "text": "hit"} }
        ]}));
        assert_eq!(invoke_match(&ctx, "m", &[json!("miss")]).unwrap(), Value::Null);
    }

    #[test]
    fn test_requirement_expr_sees_arg_binding() {
        let ctx = ctx();
        ctx.declare("big", json!({"type": "match", "branch": [
            {
                "req": [{ "expr": {"op": ">", "left": {"op": "get", "path": "_arg"}, "right": 10} }],
                "to": {"type": "text", "text": "big"}
            }
        ]}));
        assert_eq!(invoke_match(&ctx, "big", &[json!(11)]).unwrap(), json!("big"));
        assert_eq!(invoke_match(&ctx, "big", &[json!(9)]).unwrap(), Value::Null);
    }

    #[test]
    fn test_declarations_visible_from_child_contexts() {
        let outer = declared_ctx();
        let inner = outer.child();
        let out = invoke_match(&inner, "crowd", &[json!(2)]).unwrap();
        assert_eq!(out, json!("a crowd"));
    }

    #[test]
    fn test_requirements_consume_positional_args() {
        let ctx = ctx();
        ctx.declare("pair", json!({"type": "match", "branch": [
            {
                "req": [{ "expr": ["eq", "a"] }, { "expr": ["eq", "b"] }],
                "to": {"type": "text", "text": "ab"}
            }
        ]}));
        assert_eq!(
            invoke_match(&ctx, "pair", &[json!("a"), json!("b")]).unwrap(),
            json!("ab")
        );
        // A missing second arg is null and fails the eq requirement
        assert_eq!(invoke_match(&ctx, "pair", &[json!("a")]).unwrap(), Value::Null);
    }
}
