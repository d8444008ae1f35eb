//! Uniform and weight-biased selection over a sequence of items.

use serde_json::Value;

use crate::coerce::to_number;
use crate::context::Context;
use crate::error::EvalError;
use crate::expr::evaluate_expr;

/// Uniform pick: empty sequence yields `None`, otherwise index
/// `floor(rng * length)`.
pub(crate) fn uniform_choice<'a>(ctx: &Context, items: &'a [Value]) -> Option<&'a Value> {
    if items.is_empty() {
        return None;
    }
    let index = (ctx.next_f64() * items.len() as f64) as usize;
    Some(&items[index.min(items.len() - 1)])
}

/// Weight-biased pick.
///
/// Each item's weight is the evaluation of its `weight` (fallback `wt`)
/// field as a number; absent, non-finite, or negative weights count as 1.
/// A non-positive sum falls back to the first item; floating-point drift
/// falls back to the last.
pub(crate) fn weighted_choice<'a>(
    ctx: &Context,
    items: &'a [Value],
) -> Result<Option<&'a Value>, EvalError> {
    if items.is_empty() {
        return Ok(None);
    }

    let mut weights = Vec::with_capacity(items.len());
    for item in items {
        let weight = match item.get("weight").or_else(|| item.get("wt")) {
            Some(expr) => to_number(&evaluate_expr(expr, ctx)?),
            None => 1.0,
        };
        weights.push(if weight.is_finite() && weight >= 0.0 {
            weight
        } else {
            1.0
        });
    }

    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Ok(items.first());
    }

    let mut draw = ctx.next_f64() * sum;
    for (item, weight) in items.iter().zip(&weights) {
        draw -= weight;
        if draw <= 0.0 {
            return Ok(Some(item));
        }
    }
    Ok(items.last())
}
