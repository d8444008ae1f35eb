//! Error types for schema evaluation.

use thiserror::Error;

/// Terminal evaluation failures.
///
/// Everything else in the evaluator degrades silently: bad paths read as
/// null, unknown tags emit the empty string, invalid numbers propagate as
/// NaN, and loops that hit the iteration ceiling are cut short.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Entering a node would exceed the recursion ceiling.
    #[error("Recursion depth exceeded (max: {max_depth})")]
    RecursionDepthExceeded { max_depth: usize },

    /// A `parent.`-prefixed write was issued on a context with no parent,
    /// or a write targeted the bare path `parent`.
    #[error("No parent scope for write at `{path}`")]
    OrphanParentWrite { path: String },
}
