use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_admin(db_path: &Path, args: &[&str], extra_env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_visitor-admin"));
    command
        .args(args)
        .env_remove("DATABASE_BACKEND")
        .env_remove("LOG_JSON")
        .env_remove("RUST_LOG")
        .env("DATABASE_URL", format!("sqlite://{}", db_path.display()))
        .env("GEO_RESOLVER", "none");
    for (key, value) in extra_env {
        command.env(key, value);
    }
    command.output().expect("Failed to execute visitor-admin")
}

#[test]
fn test_cli_list_does_not_create_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("missing.db");

    let output = run_admin(&db_path, &["list"], &[]);

    assert!(!output.status.success());
    assert!(!db_path.exists(), "list must leave a missing database alone");
}

#[test]
fn test_cli_init_then_list_empty() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("visits.db");

    let output = run_admin(&db_path, &["init"], &[]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(db_path.exists());

    let output = run_admin(&db_path, &["list", "--json"], &[]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "[]");
}

#[test]
fn test_cli_honors_log_json() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("json-logs.db");

    let output = run_admin(
        &db_path,
        &["init"],
        &[("LOG_JSON", "1"), ("RUST_LOG", "info")],
    );
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let created = stderr
        .lines()
        .find(|line| line.contains("Created SQLite database"))
        .expect("database creation should be logged");
    let event: serde_json::Value = serde_json::from_str(created).unwrap();
    assert_eq!(event["level"], "INFO");
}

#[test]
fn test_cli_honors_rust_log_filter() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("quiet.db");

    let output = run_admin(&db_path, &["init"], &[("RUST_LOG", "error")]);
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("Created SQLite database"));
}
