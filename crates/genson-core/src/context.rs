//! Evaluation context: the scope chain, declarations, RNG handle, and
//! recursion counter.
//!
//! A [`Context`] is one evaluation frame. Node evaluation enters a sibling
//! frame (same scope storage, depth advanced); looping and layering
//! constructs create child frames (scope snapshot, fresh declarations,
//! parent back-link). Writes prefixed with `parent.` walk the back-link
//! and mutate the enclosing frame.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::config::EvalOptions;
use crate::error::EvalError;
use crate::path::{tokenize_path, PathToken};

/// Source of uniform floats in `[0, 1)` driving all random selection.
///
/// The default implementation wraps a seedable [`StdRng`]; callers may
/// supply their own source through [`Context::with_random_source`].
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

impl RandomSource for StdRng {
    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Evaluation ceilings, shared by every frame of one evaluation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub max_depth: usize,
    pub max_iterations: usize,
}

/// One evaluation frame.
///
/// Cloning a `Context` is cheap: scope, declarations, and the RNG are
/// reference-counted handles shared with related frames.
#[derive(Clone)]
pub struct Context {
    scope: Rc<RefCell<Map<String, Value>>>,
    decls: Rc<RefCell<Map<String, Value>>>,
    parent: Option<Rc<Context>>,
    rng: Rc<RefCell<Box<dyn RandomSource>>>,
    depth: usize,
    limits: Limits,
}

impl Context {
    /// Construct a root context for one evaluation. The RNG is seeded from
    /// `options.seed` when present, otherwise from entropy.
    pub fn root(options: &EvalOptions) -> Self {
        let rng: Box<dyn RandomSource> = match options.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };
        Self::with_random_source(options, rng)
    }

    /// Construct a root context driven by a caller-supplied random source.
    pub fn with_random_source(options: &EvalOptions, rng: Box<dyn RandomSource>) -> Self {
        Self {
            scope: Rc::new(RefCell::new(Map::new())),
            decls: Rc::new(RefCell::new(Map::new())),
            parent: None,
            rng: Rc::new(RefCell::new(rng)),
            depth: 0,
            limits: Limits {
                max_depth: options.max_depth,
                max_iterations: options.max_iterations,
            },
        }
    }

    /// Enter a node: advance the recursion counter and hand back the
    /// sibling frame the node evaluates under. Scope and declarations are
    /// the same storage, so writes made here stay visible to following
    /// siblings.
    pub(crate) fn enter(&self) -> Result<Self, EvalError> {
        if self.depth + 1 > self.limits.max_depth {
            return Err(EvalError::RecursionDepthExceeded {
                max_depth: self.limits.max_depth,
            });
        }
        let mut frame = self.clone();
        frame.depth += 1;
        Ok(frame)
    }

    /// Create a child frame for a looping or layering construct: scope
    /// entries are snapshotted, declarations start empty (the chain stays
    /// visible through the parent link), and the back-link points here.
    pub(crate) fn child(&self) -> Self {
        Self {
            scope: Rc::new(RefCell::new(self.scope.borrow().clone())),
            decls: Rc::new(RefCell::new(Map::new())),
            parent: Some(Rc::new(self.clone())),
            rng: Rc::clone(&self.rng),
            depth: self.depth,
            limits: self.limits,
        }
    }

    pub(crate) fn next_f64(&self) -> f64 {
        self.rng.borrow_mut().next_f64()
    }

    pub(crate) fn limits(&self) -> Limits {
        self.limits
    }

    /// Bind a name directly in this frame's scope.
    pub(crate) fn define_local(&self, name: &str, value: Value) {
        self.scope.borrow_mut().insert(name.to_string(), value);
    }

    /// Register a declaration in this frame.
    pub(crate) fn declare(&self, name: &str, decl: Value) {
        self.decls.borrow_mut().insert(name.to_string(), decl);
    }

    /// Find a declaration of the given kind by walking the chain outward,
    /// innermost frame first.
    pub(crate) fn lookup_decl(&self, name: &str, kind: &str) -> Option<Value> {
        let mut cursor = Some(self);
        while let Some(ctx) = cursor {
            if let Some(decl) = ctx.decls.borrow().get(name) {
                if decl.get("type").and_then(Value::as_str) == Some(kind) {
                    return Some(decl.clone());
                }
            }
            cursor = ctx.parent.as_deref();
        }
        None
    }

    /// Read the value at a path. Missing slots, out-of-range indices, and
    /// type-mismatched steps yield null. The empty path yields the whole
    /// scope; `parent`-qualified paths walk the back-link (null when there
    /// is no parent).
    pub fn get_path(&self, path: &str) -> Value {
        if path == "parent" {
            return match &self.parent {
                Some(parent) => Value::Object(parent.scope.borrow().clone()),
                None => Value::Null,
            };
        }
        if let Some(rest) = path.strip_prefix("parent.") {
            return match &self.parent {
                Some(parent) => parent.get_path(rest),
                None => Value::Null,
            };
        }

        let tokens = tokenize_path(path);
        let scope = self.scope.borrow();
        let Some((first, rest)) = tokens.split_first() else {
            return Value::Object(scope.clone());
        };
        let mut cursor = match scope.get(&first.key()) {
            Some(value) => value,
            None => return Value::Null,
        };
        for token in rest {
            let next = match (cursor, token) {
                (Value::Object(map), _) => map.get(&token.key()),
                (Value::Array(items), PathToken::Index(i)) => items.get(*i),
                _ => None,
            };
            cursor = match next {
                Some(value) => value,
                None => return Value::Null,
            };
        }
        cursor.clone()
    }

    /// Write a value at a path, creating missing intermediate mappings
    /// (never sequences — a non-mapping intermediate is replaced). The
    /// empty path is a no-op. A `parent.`-qualified write walks the
    /// back-link; issuing one with no parent, or writing the bare path
    /// `parent`, is an error.
    pub fn set_path(&self, path: &str, value: Value) -> Result<(), EvalError> {
        if let Some(rest) = path.strip_prefix("parent.") {
            let parent = self.parent.as_ref().ok_or_else(|| EvalError::OrphanParentWrite {
                path: path.to_string(),
            })?;
            return parent.set_path(rest, value);
        }
        if path == "parent" {
            return Err(EvalError::OrphanParentWrite {
                path: path.to_string(),
            });
        }

        let tokens = tokenize_path(path);
        let Some((last, intermediate)) = tokens.split_last() else {
            return Ok(());
        };
        let mut scope = self.scope.borrow_mut();
        let mut cursor: &mut Map<String, Value> = &mut scope;
        for token in intermediate {
            let slot = cursor
                .entry(token.key())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            cursor = match slot {
                Value::Object(map) => map,
                // Just replaced with a mapping above; kept total.
                _ => return Ok(()),
            };
        }
        cursor.insert(last.key(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// A random source replaying a fixed script of draws, for deterministic
/// selection in unit tests. Repeats its last value once exhausted.
#[cfg(test)]
pub(crate) struct ScriptedSource {
    values: Vec<f64>,
    cursor: usize,
}

#[cfg(test)]
impl ScriptedSource {
    pub(crate) fn new(values: &[f64]) -> Self {
        Self {
            values: values.to_vec(),
            cursor: 0,
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedSource {
    fn next_f64(&mut self) -> f64 {
        let value = self
            .values
            .get(self.cursor)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0.0);
        self.cursor += 1;
        value
    }
}

/// Root context whose RNG replays the given draws.
#[cfg(test)]
pub(crate) fn scripted_context(draws: &[f64]) -> Context {
    Context::with_random_source(&EvalOptions::default(), Box::new(ScriptedSource::new(draws)))
}

// ===========================================================================
// Tests
// ===========================================================================
