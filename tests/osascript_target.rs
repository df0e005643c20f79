//! Subprocess handling of the osascript target, using shell scripts in
//! place of the real interpreter.
#![cfg(unix)]

use omnifocus_mcp::config::ExecutorConfig;
use omnifocus_mcp::error::{BridgeError, ErrorKind};
use omnifocus_mcp::omnifocus::models::TaskCount;
use omnifocus_mcp::omnifocus::{Executor, ScriptBuilder, ScriptPayload};
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

fn fake_osascript(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("osascript");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn executor(path: PathBuf, timeout_ms: u64, max_output_bytes: usize) -> Executor {
    Executor::osascript(ExecutorConfig {
        timeout_ms,
        max_output_bytes,
        osascript_path: path.to_string_lossy().into_owned(),
        ..Default::default()
    })
}

fn payload() -> ScriptPayload {
    ScriptBuilder::new().body("return JSON.stringify({count: 2});").build()
}

#[tokio::test]
#[serial]
async fn stdout_is_decoded() {
    let dir = TempDir::new().unwrap();
    let path = fake_osascript(&dir, r#"echo '{"count": 2}'"#);

    let count: TaskCount = executor(path, 5_000, 1024).run_json(&payload()).await.unwrap();
    assert_eq!(count.count, 2);
}

#[tokio::test]
#[serial]
async fn receives_jxa_program_as_argument() {
    let dir = TempDir::new().unwrap();
    let path = fake_osascript(&dir, r#"printf '"%s|%s|%s"' "$1" "$2" "$(echo "$4" | head -c 6)""#);

    let out = executor(path, 5_000, 1024).run(&payload()).await.unwrap();
    assert_eq!(out, "\"-l|JavaScript|(() =>\"");
}

#[tokio::test]
#[serial]
async fn nonzero_exit_is_classified() {
    let dir = TempDir::new().unwrap();
    let path = fake_osascript(
        &dir,
        "echo 'execution error: Error: OmniFocus got an error: Application is not running. (-600)' >&2\nexit 1",
    );

    let err = executor(path, 5_000, 1024).run(&payload()).await.unwrap_err();
    assert_eq!(err, BridgeError::NotRunning);
}

#[tokio::test]
#[serial]
async fn script_error_keeps_stderr_text() {
    let dir = TempDir::new().unwrap();
    let path = fake_osascript(&dir, "printf 'Error: Task not found: abc' >&2\nexit 1");

    let err = executor(path, 5_000, 1024).run(&payload()).await.unwrap_err();
    assert_eq!(err, BridgeError::script("Error: Task not found: abc"));
}

#[tokio::test]
#[serial]
async fn slow_script_times_out() {
    let dir = TempDir::new().unwrap();
    let path = fake_osascript(&dir, "exec sleep 10");

    let started = std::time::Instant::now();
    let err = executor(path, 200, 1024).run(&payload()).await.unwrap_err();

    assert_eq!(err, BridgeError::Timeout { timeout_ms: 200 });
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
#[serial]
async fn runaway_output_is_cut_off() {
    let dir = TempDir::new().unwrap();
    let path = fake_osascript(&dir, "exec yes");

    let err = executor(path, 5_000, 64 * 1024).run(&payload()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ScriptError);
    assert!(err.to_string().contains("65536 byte limit"));
}

#[tokio::test]
#[serial]
async fn missing_interpreter_is_a_script_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does-not-exist");

    let err = executor(path, 5_000, 1024).run(&payload()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ScriptError);
    assert!(err.to_string().starts_with("Failed to launch"));
}
