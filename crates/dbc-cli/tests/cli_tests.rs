//! Integration tests for the dbc CLI
//!
//! These tests invoke the actual dbc-cli binary and verify:
//! - Exit codes (0 = success, 1 = validation failure or violation, 2 = error)
//! - stdout/stderr output
//! - JSON output format

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn dbc_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dbc-cli"))
}

fn fixture_valid(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(format!("../../tests/fixtures/manifests/valid/{}", name))
}

fn fixture_invalid(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(format!("../../tests/fixtures/manifests/invalid/{}", name))
}

fn run_dbc(args: &[&str]) -> std::process::Output {
    Command::new(dbc_bin())
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute dbc-cli")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("should be valid JSON")
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_dbc(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dbc"), "should contain 'dbc'");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "should contain version"
    );
}

#[test]
fn test_version_flag() {
    let output = run_dbc(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

// ── Validate ──────────────────────────────────────────────

#[test]
fn test_validate_valid_manifest() {
    let output = run_dbc(&["validate", fixture_valid("divide.json").to_str().unwrap()]);
    assert!(output.status.success(), "valid manifest should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("valid"), "should mention valid");
}

#[test]
fn test_validate_missing_list() {
    let output = run_dbc(&[
        "validate",
        fixture_invalid("missing-preconditions.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1), "invalid manifest should exit 1");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("preconditions must be an array"));
}

#[test]
fn test_validate_missing_predicate() {
    let output = run_dbc(&[
        "validate",
        fixture_invalid("bad-predicate.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("all postconditions have a function"));
}

#[test]
fn test_validate_target_not_callable() {
    let output = run_dbc(&[
        "validate",
        fixture_invalid("not-a-function.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("First argument must be a function"));
}

#[test]
fn test_validate_syntax_error() {
    let output = run_dbc(&[
        "validate",
        fixture_invalid("syntax-error.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Parse error"));
}

#[test]
fn test_validate_nonexistent_file() {
    let output = run_dbc(&["validate", "nonexistent.json"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
}

#[test]
fn test_validate_json_output() {
    let output = run_dbc(&[
        "validate",
        "--json",
        fixture_valid("sum.json").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["errors"], 0);
}

#[test]
fn test_validate_json_invalid() {
    let output = run_dbc(&[
        "validate",
        "--json",
        fixture_invalid("missing-preconditions.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["valid"], false);
    assert_eq!(json["messages"][0], "preconditions must be an array");
}

#[test]
fn test_validate_json_reports_decode_error() {
    let output = run_dbc(&[
        "validate",
        "--json",
        fixture_invalid("not-json.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["valid"], false);
    assert_eq!(json["errors"], 1);
    let message = json["messages"][0].as_str().expect("decode error should be reported");
    assert!(message.contains("Invalid manifest JSON"), "got {}", message);
}

#[test]
fn test_validate_quiet_valid() {
    let output = run_dbc(&[
        "--quiet",
        "validate",
        fixture_valid("divide.json").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.is_empty(), "quiet mode should produce no stdout");
}

// ── Run ───────────────────────────────────────────────────

#[test]
fn test_run_precondition_violation() {
    let output = run_dbc(&["run", fixture_valid("divide.json").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1), "raised violation should exit 1");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot divide by zero"));
}

#[test]
fn test_run_broken_invariant() {
    let output = run_dbc(&[
        "run",
        "--json",
        fixture_valid("broken-invariant.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "inputs are not same");
    assert_eq!(json["calls"][0]["outcome"]["status"], "violated");
    assert_eq!(json["calls"][0]["outcome"]["kind"], "invariant");
    assert_eq!(json["final_state"]["n2"], 5);
}

#[test]
fn test_run_with_args() {
    let output = run_dbc(&[
        "run",
        "--json",
        "--args",
        "[4]",
        "--args",
        "[5]",
        fixture_valid("sum.json").to_str().unwrap(),
    ]);
    assert!(output.status.success(), "calls within limit should exit 0");
    let json = stdout_json(&output);
    assert_eq!(json["calls"].as_array().unwrap().len(), 2);
    assert_eq!(json["calls"][1]["outcome"]["value"], 9);
    assert_eq!(json["final_state"]["total"], 9);
}

#[test]
fn test_run_postcondition_stops_execution() {
    let output = run_dbc(&[
        "run",
        "--json",
        "--args",
        "[6]",
        "--args",
        "[6]",
        "--args",
        "[1]",
        fixture_valid("sum.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["calls"].as_array().unwrap().len(), 2);
    assert_eq!(json["error"], "total over limit");
}

#[test]
fn test_run_return_policy() {
    let output = run_dbc(&[
        "run",
        "--json",
        "--on-violation",
        "return",
        fixture_valid("divide.json").to_str().unwrap(),
    ]);
    assert!(output.status.success(), "returned violations should exit 0");
    let json = stdout_json(&output);
    assert_eq!(json["success"], true);
    assert_eq!(json["calls"][0]["outcome"]["message"], "cannot divide by zero");
}

#[test]
fn test_run_bad_policy() {
    let output = run_dbc(&[
        "run",
        "--on-violation",
        "ignore",
        fixture_valid("divide.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2), "clap usage errors exit 2");
}

#[test]
fn test_run_bad_args() {
    let output = run_dbc(&[
        "run",
        "--args",
        "{\"a\": 1}",
        fixture_valid("sum.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("must be a JSON array"));
}

#[test]
fn test_run_async_manifest() {
    let output = run_dbc(&[
        "run",
        "--json",
        fixture_valid("counter-async.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["error"], "counter must not change");
    assert_eq!(json["final_state"]["count"], 1);
}

#[test]
fn test_run_human_output() {
    let output = run_dbc(&["run", fixture_valid("broken-invariant.json").to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("broken-invariant"));
    assert!(stdout.contains("call #0"));
}

#[test]
fn test_run_invalid_manifest() {
    let output = run_dbc(&[
        "run",
        fixture_invalid("not-a-function.json").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
}

// ── Hash ──────────────────────────────────────────────────

#[test]
fn test_hash_valid_manifest() {
    let output = run_dbc(&["hash", fixture_valid("divide.json").to_str().unwrap()]);
    assert!(output.status.success(), "hash should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(stdout.len(), 64, "SHA-256 hash should be 64 hex chars");
    assert!(stdout.chars().all(|c| c.is_ascii_hexdigit()), "hash should be hex");
}

#[test]
fn test_hash_determinism() {
    let fixture = fixture_valid("sum.json");
    let path = fixture.to_str().unwrap();

    let first = run_dbc(&["hash", path]);
    let first_hash = String::from_utf8_lossy(&first.stdout).trim().to_string();

    for _ in 0..10 {
        let output = run_dbc(&["hash", path]);
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        assert_eq!(first_hash, hash, "hash must be deterministic");
    }
}

#[test]
fn test_hash_differs_between_manifests() {
    let a = run_dbc(&["hash", fixture_valid("divide.json").to_str().unwrap()]);
    let b = run_dbc(&["hash", fixture_valid("sum.json").to_str().unwrap()]);
    assert_ne!(a.stdout, b.stdout);
}
