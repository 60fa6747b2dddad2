//! Runs the borg-verifier binary end to end

use std::path::Path;
use std::process::{Command, Output};

fn borg_verifier(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_borg-verifier"))
        .args(args)
        .env_remove("BORG_VERIFIER_AUTH_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run borg-verifier")
}

/// Tool config whose "borg" touches `marker` and then passes every verb
fn marker_config(dir: &Path, marker: &Path) -> std::path::PathBuf {
    let script = r#"touch "$MARKER"; case "$3" in info) echo '{}' ;; list) echo '{"archives": []}' ;; esac"#;
    let config = serde_json::json!({
        "command": "sh",
        "args": ["-c", script, "borg"],
        "env": { "MARKER": marker.to_str().unwrap() }
    });

    let path = dir.join("borg.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

#[test]
fn partial_credentials_rejected_before_verification() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("borg-ran");
    let config = marker_config(dir.path(), &marker);

    let output = borg_verifier(&[
        "127.0.0.1:1",
        "/srv/repo",
        "--auth-username",
        "user",
        "--config",
        config.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Both of auth username and password must be specified"));
    assert!(!marker.exists(), "borg must not run with partial credentials");
}

#[test]
fn password_without_username_rejected() {
    let output = borg_verifier(&["127.0.0.1:1", "/srv/repo", "--auth-password", "secret"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Both of auth username and password must be specified"));
}

#[test]
fn unreachable_gateway_fails_after_verification() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("borg-ran");
    let config = marker_config(dir.path(), &marker);

    let output = borg_verifier(&[
        "127.0.0.1:1",
        "/srv/repo",
        "--instance",
        "test",
        "--config",
        config.to_str().unwrap(),
    ]);

    assert!(marker.exists(), "verification runs before delivery");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to deliver metrics"));
}

#[test]
fn missing_repository_argument_is_usage_error() {
    let output = borg_verifier(&["127.0.0.1:9091"]);
    assert!(!output.status.success());
}
