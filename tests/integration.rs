use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const SECRET_VARS: &[&str] = &[
    "AIRTABLE_BASE_ID",
    "AIRTABLE_API_KEY",
    "CLAUDE_API_KEY",
    "BRAVE_API_KEY",
    "SERPAPI_KEY",
    "PORT",
];

fn vcdb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("vcdb");
    path
}

fn setup_test_env(config_content: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("vcdb.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

/// Run `vcdb` with a clean environment plus `env`.
fn run_vcdb(config_path: &Path, env: &[(&str, &str)], args: &[&str]) -> (String, String, bool) {
    let binary = vcdb_binary();
    let mut cmd = Command::new(&binary);
    for var in SECRET_VARS {
        cmd.env_remove(var);
    }
    cmd.envs(env.iter().copied())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args);

    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run vcdb binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_sync_requires_store_credentials() {
    let (_tmp, config_path) = setup_test_env("");
    let (stdout, stderr, success) = run_vcdb(&config_path, &[], &["sync"]);
    assert!(!success, "sync should fail: stdout={}", stdout);
    assert!(stderr.contains("AIRTABLE_BASE_ID"), "stderr={}", stderr);
}

#[test]
fn test_ask_requires_store_credentials() {
    let (_tmp, config_path) = setup_test_env("");
    let (_, stderr, success) = run_vcdb(
        &config_path,
        &[("AIRTABLE_BASE_ID", "app123")],
        &["ask", "What's Acme's status?"],
    );
    assert!(!success);
    assert!(stderr.contains("Missing Airtable credentials"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env("[model]\nmax_tokens = 0\n");
    let (_, stderr, success) = run_vcdb(&config_path, &[], &["sync"]);
    assert!(!success);
    assert!(stderr.contains("max_tokens"), "stderr={}", stderr);
}

#[test]
fn test_unparseable_config_rejected() {
    let (_tmp, config_path) = setup_test_env("[store\ntables = ");
    let (_, stderr, success) = run_vcdb(&config_path, &[], &["context"]);
    assert!(!success);
    assert!(stderr.contains("Failed to parse config file"));
}

#[test]
fn test_ask_with_unconfigured_model_reports_it() {
    // No model key: the reply names the problem instead of failing the command.
    let (_tmp, config_path) = setup_test_env(
        r#"[store]
base_url = "http://127.0.0.1:1/v0"
timeout_secs = 2
"#,
    );
    let (stdout, stderr, success) = run_vcdb(
        &config_path,
        &[("AIRTABLE_BASE_ID", "app123"), ("AIRTABLE_API_KEY", "key")],
        &["ask", "What's Acme's status?"],
    );
    assert!(success, "stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Language model API not configured"));
}

#[test]
fn test_sync_against_unreachable_store_fails() {
    let (_tmp, config_path) = setup_test_env(
        r#"[store]
base_url = "http://127.0.0.1:1/v0"
tables = ["Companies"]
timeout_secs = 2
"#,
    );
    let (_, stderr, success) = run_vcdb(
        &config_path,
        &[("AIRTABLE_BASE_ID", "app123"), ("AIRTABLE_API_KEY", "key")],
        &["sync"],
    );
    assert!(!success);
    assert!(stderr.contains("no records found"), "stderr={}", stderr);
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("absent.toml");
    let (_, stderr, success) = run_vcdb(&missing, &[], &["sync"]);
    // Defaults load fine; failure comes from missing credentials, not the file.
    assert!(!success);
    assert!(stderr.contains("Missing Airtable credentials"));
    assert!(!stderr.contains("Failed to read config file"));
}
