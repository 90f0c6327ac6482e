//! Binary-driven CLI integration tests.
//!
//! Only the offline surface is exercised here: `init`, `stats`, argument
//! validation, and the analyze-before-scan failure. Scanning against the
//! real upstream is covered by the library tests with a fake source.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ilens_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ilens");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/ilens.sqlite"

[llm]
url = "http://localhost:11434"
model = "llama3.1"

[server]
bind = "127.0.0.1:7878"
"#,
        root.display()
    );

    let config_path = config_dir.join("ilens.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ilens(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ilens_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ilens binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ilens(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/ilens.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ilens(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ilens(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_stats_on_fresh_database() {
    let (_tmp, config_path) = setup_test_env();

    run_ilens(&config_path, &["init"]);
    let (stdout, stderr, success) = run_ilens(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Issues:      0"));
}

#[test]
fn test_scan_rejects_malformed_slug() {
    let (_tmp, config_path) = setup_test_env();

    run_ilens(&config_path, &["init"]);
    let (_, stderr, success) = run_ilens(&config_path, &["scan", "not-a-slug"]);
    assert!(!success);
    assert!(stderr.contains("owner/name"));
}

#[test]
fn test_analyze_before_scan_says_scan_first() {
    let (_tmp, config_path) = setup_test_env();

    run_ilens(&config_path, &["init"]);
    let (_, stderr, success) = run_ilens(
        &config_path,
        &["analyze", "acme/app", "what is going on?"],
    );
    assert!(!success);
    assert!(stderr.contains("run a scan first"));
}

#[test]
fn test_missing_config_fails_with_context() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_ilens(&missing, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
