//! Configuration for schema evaluation.

use serde::{Deserialize, Serialize};

/// Options for schema evaluation.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `max-depth`,
/// `max-iterations`). This naming convention is part of the public API
/// contract for config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EvalOptions {
    /// RNG seed. When present, the entire evaluation is reproducible.
    pub seed: Option<u64>,
    /// Recursion ceiling for node evaluation. Exceeding it is a fatal
    /// error. Default: 100.
    pub max_depth: usize,
    /// Per-loop iteration ceiling. Loops that reach it are terminated
    /// silently. Default: 10,000.
    pub max_iterations: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            seed: None,
            max_depth: 100,
            max_iterations: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_options_serde_round_trip() {
        let opts = EvalOptions {
            seed: Some(42),
            max_depth: 64,
            max_iterations: 500,
        };

        let json = serde_json::to_string(&opts).unwrap();

        // Verify kebab-case field names are in the JSON
        assert!(json.contains("\"max-depth\""));
        assert!(json.contains("\"max-iterations\""));

        let deserialized: EvalOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.seed, Some(42));
        assert_eq!(deserialized.max_depth, 64);
        assert_eq!(deserialized.max_iterations, 500);
    }

    #[test]
    fn test_defaults_apply_when_fields_omitted() {
        let opts: EvalOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.seed, None);
        assert_eq!(opts.max_depth, 100);
        assert_eq!(opts.max_iterations, 10_000);
    }

    #[test]
    fn test_seed_alone_is_enough() {
        let opts: EvalOptions = serde_json::from_str(r#"{ "seed": 7 }"#).unwrap();
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.max_depth, 100, "unset fields should keep defaults");
    }
}
