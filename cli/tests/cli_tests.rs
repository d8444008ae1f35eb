//! CLI binary integration tests using assert_cmd + predicates.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("genson").expect("binary should exist")
}

fn greeting_schema() -> String {
    serde_json::json!({ "type": "text", "text": "hello" }).to_string()
}

// ── Basic evaluation ────────────────────────────────────────────────────────

#[test]
fn test_evaluates_schema_to_stdout_with_trailing_newline() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("schema.json");
    fs::write(&input, greeting_schema()).unwrap();

    cmd()
        .args(["-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::eq("hello\n"));
}

#[test]
fn test_long_input_flag() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("schema.json");
    fs::write(&input, greeting_schema()).unwrap();

    cmd()
        .args(["--input", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));
}

#[test]
fn test_default_input_is_example_json_in_cwd() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("example.json"), greeting_schema()).unwrap();

    cmd()
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::eq("hello\n"));
}

// ── Failure modes ───────────────────────────────────────────────────────────

#[test]
fn test_missing_input_file_fails() {
    let dir = TempDir::new().unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["-i", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open input file"));
}

#[test]
fn test_invalid_json_fails_with_context() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.json");
    fs::write(&input, "{ not json").unwrap();

    cmd()
        .args(["-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse schema"));
}

#[test]
fn test_runaway_recursion_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("deep.json");

    let mut schema = serde_json::json!({ "type": "text", "text": "leaf" });
    for _ in 0..200 {
        schema = serde_json::json!({ "type": "sequence", "items": [schema] });
    }
    fs::write(&input, schema.to_string()).unwrap();

    cmd()
        .args(["-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Recursion depth exceeded"));
}

// ── Seeding and limits ──────────────────────────────────────────────────────

#[test]
fn test_seed_makes_output_reproducible() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("random.json");
    let schema = serde_json::json!({
        "type": "repetition",
        "times": 16,
        "value": { "type": "option", "items": ["a", "b", "c", "d", "e", "f"] }
    });
    fs::write(&input, schema.to_string()).unwrap();

    let first = cmd()
        .args(["-i", input.to_str().unwrap(), "--seed", "42"])
        .assert()
        .success();
    let second = cmd()
        .args(["-i", input.to_str().unwrap(), "--seed", "42"])
        .assert()
        .success();

    assert_eq!(
        first.get_output().stdout,
        second.get_output().stdout,
        "same seed must produce byte-identical output"
    );
}

#[test]
fn test_max_iterations_caps_loops() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("loop.json");
    let schema = serde_json::json!({
        "type": "delegate",
        "weight": 1000000,
        "value": { "type": "text", "text": "x" }
    });
    fs::write(&input, schema.to_string()).unwrap();

    cmd()
        .args(["-i", input.to_str().unwrap(), "--max-iterations", "8"])
        .assert()
        .success()
        .stdout(predicate::eq("xxxxxxxx\n"));
}

#[test]
fn test_max_depth_flag_tightens_the_ceiling() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("shallow.json");
    let schema = serde_json::json!({
        "type": "sequence",
        "items": [{ "type": "sequence", "items": [{ "type": "text", "text": "ok" }] }]
    });
    fs::write(&input, schema.to_string()).unwrap();

    cmd()
        .args(["-i", input.to_str().unwrap(), "--max-depth", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Recursion depth exceeded"));
}
