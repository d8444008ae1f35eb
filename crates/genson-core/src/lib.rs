//! Evaluate GenSON schemas — JSON-encoded trees of tagged nodes describing
//! a small procedural text-generation language — into generated strings.
//!
//! The evaluator walks the tree top-down under a hierarchical scope and a
//! random number source. Nodes emit strings; the expression sub-language
//! computes values; `layer` nodes register reusable Match/Domain
//! declarations visible to their descendants; the looping constructs
//! (`repetition`, `delegate`) inject loop variables into child scopes.
//!
//! Schemas are consumed as raw `serde_json::Value` trees — there is no
//! parsed intermediate form, and malformed input degrades to empty output
//! rather than failing.
//!
//! ## Example
//!
//! ```
//! use genson_core::{evaluate, EvalOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "repetition",
//!     "times": 3,
//!     "value": { "type": "text", "text": "x" },
//!     "separator": { "type": "text", "text": "," }
//! });
//! let out = evaluate(&schema, &EvalOptions::default()).unwrap();
//! assert_eq!(out, "x,x,x");
//! ```
//!
//! Pass a `seed` through [`EvalOptions`] to make every random pick — and
//! therefore the whole output — reproducible.

use serde_json::Value;

mod coerce;
pub mod config;
pub mod context;
pub mod error;
mod expr;
mod matcher;
mod node;
mod path;
mod select;

pub use config::EvalOptions;
pub use context::{Context, RandomSource};
pub use error::EvalError;
pub use expr::evaluate_expr;
pub use node::evaluate_node;

/// Evaluate a schema document to its generated string.
///
/// Constructs a root context (seeding the RNG from `options.seed` when
/// present) and runs the node evaluator over the whole tree.
pub fn evaluate(schema: &Value, options: &EvalOptions) -> Result<String, EvalError> {
    let ctx = Context::root(options);
    evaluate_node(schema, &ctx)
}
