use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Points at a closed local port so an accidental request fails fast.
const OFFLINE_URL: &str = "http://127.0.0.1:9";

fn run(session_file: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_admin-console"))
        .args(args)
        .env("CONSOLE_SESSION_FILE", session_file)
        .env("CONSOLE_BASE_URL", OFFLINE_URL)
        .env("RUST_LOG", "warn")
        .env_remove("CONSOLE_TOKEN")
        .output()
        .expect("failed to run binary")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn login_then_logout() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");

    let output = run(&session, &["login", "--token", "abc123", "--role", "admin"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&session).unwrap()).unwrap();
    assert_eq!(stored["token"], "abc123");
    assert_eq!(stored["role"], "ADMIN");

    let output = run(&session, &["logout"]);
    assert!(output.status.success());
    assert!(!session.exists());

    // logging out twice is fine
    assert!(run(&session, &["logout"]).status.success());
}

#[test]
fn list_without_session_requires_sign_in() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");

    let output = run(&session, &["list", "users"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("sign in"));
}

#[test]
fn non_admin_session_is_refused() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    assert!(
        run(&session, &["login", "--token", "t", "--role", "user"])
            .status
            .success()
    );

    let output = run(&session, &["approve", "deposit", "10", "--yes"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(session.exists());
}

#[test]
fn invalid_amount_fails_before_any_request() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");
    assert!(
        run(&session, &["login", "--token", "t", "--role", "admin"])
            .status
            .success()
    );

    let output = run(&session, &["credit", "w1", "-5", "--yes"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Enter a valid amount"));
}

#[test]
fn unsupported_base_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session.json");

    let output = run(
        &session,
        &["--base-url", "ftp://example.test", "list", "users"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unsupported url scheme"));
}

#[test]
fn unknown_collection_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir.path().join("session.json"), &["list", "invoices"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown collection"));
}
