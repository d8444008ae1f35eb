//! Property-based tests for path-addressed scope access.
//!
//! Properties under test:
//! 1. set/get roundtrip: after `set_path(p, v)`, `get_path(p)` yields `v`
//! 2. last-wins: two writes through the same path leave the second value
//! 3. spelling equivalence: dotted and bracketed spellings address the
//!    same slot

use genson_core::{Context, EvalOptions};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Plain identifier segments. `parent` is excluded — that spelling walks
/// the context chain instead of the scope tree.
fn arb_segment() -> impl Strategy<Value = String> {
    "[a-z_$][a-z0-9_$]{0,7}".prop_filter("`parent` is a qualified prefix", |s| s != "parent")
}

fn arb_path() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(arb_segment(), 1..5)
}

/// Assignable leaf values.
fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Bool(true)),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::from),
        any::<(i64, i64)>().prop_map(|(a, b)| json!([a, b])),
        "[a-z]{1,8}".prop_map(|k| json!({ k: 1 })),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, ..Default::default() })]

    /// Property: `get_path(p)` after `set_path(p, v)` equals `v`.
    #[test]
    fn set_then_get_roundtrip(segments in arb_path(), value in arb_value()) {
        let path = segments.join(".");
        let ctx = Context::root(&EvalOptions::default());
        ctx.set_path(&path, value.clone()).unwrap();
        prop_assert_eq!(ctx.get_path(&path), value);
    }

    /// Property: the second write through a path wins.
    #[test]
    fn second_write_wins(segments in arb_path(), first in arb_value(), second in arb_value()) {
        let path = segments.join(".");
        let ctx = Context::root(&EvalOptions::default());
        ctx.set_path(&path, first).unwrap();
        ctx.set_path(&path, second.clone()).unwrap();
        prop_assert_eq!(ctx.get_path(&path), second);
    }

    /// Property: `a.b.c` and `a[b][c]` address the same slot.
    #[test]
    fn bracket_spelling_is_equivalent(segments in arb_path(), value in arb_value()) {
        let dotted = segments.join(".");
        let mut bracketed = segments[0].clone();
        for segment in &segments[1..] {
            bracketed.push('[');
            bracketed.push_str(segment);
            bracketed.push(']');
        }
        let ctx = Context::root(&EvalOptions::default());
        ctx.set_path(&dotted, value.clone()).unwrap();
        prop_assert_eq!(ctx.get_path(&bracketed), value);
    }
}
