//! Integration tests for the `keysvc` CLI binary.
//!
//! These run the CLI as a subprocess and check exit codes and output. Most
//! point it at an address where nothing listens; the end-to-end tests start
//! an in-memory server on an ephemeral port first.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use keysvc_core::directory::{
    ServiceConfig, ServiceDirectory, ServiceEndpoint, ServiceName, StoreLocations,
};
use keysvc_server::routes;
use keysvc_server::state::AppState;
use keysvc_storage::MemoryBackend;

const HOOKS_KEY: &str = "cli-test-hooks-key";
const DEAD_ADDR: &str = "http://127.0.0.1:19999";

/// Helper: locate the `keysvc` binary built by `cargo test`.
fn keysvc_bin() -> String {
    let path = env!("CARGO_BIN_EXE_keysvc");
    assert!(Path::new(path).exists(), "keysvc binary not found at {path}");
    path.to_owned()
}

/// Helper: run keysvc against `addr` and return (`exit_code`, stdout, stderr).
fn run_at(addr: &str, service_key: Option<&str>, args: &[&str]) -> (i32, String, String) {
    let mut cmd = Command::new(keysvc_bin());
    cmd.args(args)
        .env("KEYSVC_ADDR", addr)
        .env_remove("KEYSVC_SERVICE_KEY");
    if let Some(key) = service_key {
        cmd.env("KEYSVC_SERVICE_KEY", key);
    }
    let output = cmd.output().expect("failed to execute keysvc");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

fn run(args: &[&str]) -> (i32, String, String) {
    run_at(DEAD_ADDR, None, args)
}

/// Start a server with an in-memory store and return its address.
async fn spawn_server() -> String {
    let config = ServiceConfig {
        services: ServiceDirectory::new()
            .with(ServiceName::Hooks, ServiceEndpoint::new(HOOKS_KEY, "h")),
        locations: StoreLocations::defaults().unwrap(),
    };
    let state = Arc::new(AppState::new(config, Arc::new(MemoryBackend::new())));
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, routes::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn run_async(addr: &str, service_key: Option<&str>, args: &[&str]) -> (i32, String, String) {
    let addr = addr.to_owned();
    let service_key = service_key.map(str::to_owned);
    let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_at(&addr, service_key.as_deref(), &args)
    })
    .await
    .unwrap()
}

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0, "keysvc --version should exit 0");
    assert!(stdout.contains("keysvc"), "version output should contain 'keysvc': {stdout}");
}

#[test]
fn test_help_flag() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0, "keysvc --help should exit 0");
    for sub in ["status", "hooks", "agent", "user", "bundle"] {
        assert!(stdout.contains(sub), "help should list '{sub}': {stdout}");
    }
}

#[test]
fn test_subcommand_help() {
    for sub in ["hooks", "agent", "user", "bundle"] {
        let (code, stdout, _) = run(&[sub, "--help"]);
        assert_eq!(code, 0, "keysvc {sub} --help should exit 0");
        assert!(stdout.contains("validate"), "{sub} help should list 'validate'");
    }
    let (_, stdout, _) = run(&["hooks", "--help"]);
    assert!(stdout.contains("list"));
}

#[test]
fn test_missing_arguments_fail() {
    let (code, _, _) = run(&["hooks", "validate", "c1"]);
    assert_ne!(code, 0, "validate without --key/--secret should fail");
}

// ── Offline failures ─────────────────────────────────────────────────

#[test]
fn test_status_without_server_fails() {
    let (code, _, stderr) = run(&["status"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Error"), "stderr should explain the failure: {stderr}");
}

#[test]
fn test_privileged_command_without_service_key_fails() {
    let (code, _, stderr) = run(&["hooks", "create", "c1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("KEYSVC_SERVICE_KEY"), "{stderr}");
}

// ── Against a live server ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_against_live_server() {
    let addr = spawn_server().await;
    let (code, stdout, _) = run_async(&addr, None, &["--json", "status"]).await;
    assert_eq!(code, 0);
    assert!(stdout.contains("\"ok\""), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hooks_create_then_validate() {
    let addr = spawn_server().await;

    let (code, stdout, _) =
        run_async(&addr, Some(HOOKS_KEY), &["--json", "hooks", "create", "acme"]).await;
    assert_eq!(code, 0, "{stdout}");
    let created: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let key = created["key"].as_str().unwrap().to_owned();
    let secret = created["secret"].as_str().unwrap().to_owned();

    let (code, _, _) = run_async(
        &addr,
        Some(HOOKS_KEY),
        &["hooks", "validate", "acme", "--key", &key, "--secret", &secret],
    )
    .await;
    assert_eq!(code, 0);

    let (code, _, _) = run_async(
        &addr,
        Some(HOOKS_KEY),
        &["hooks", "validate", "acme", "--key", &key, "--secret", "wrong"],
    )
    .await;
    assert_eq!(code, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_service_key_exits_nonzero() {
    let addr = spawn_server().await;
    let (code, stdout, _) = run_async(&addr, Some("not-a-key"), &["agent", "create", "acme"]).await;
    assert_eq!(code, 1);
    assert!(stdout.contains("invalid service key"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bundle_round_trip() {
    let addr = spawn_server().await;

    let (code, stdout, _) =
        run_async(&addr, Some(HOOKS_KEY), &["--json", "bundle", "create", "u1"]).await;
    assert_eq!(code, 0, "{stdout}");
    let created: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let billing = created["billing_service"].as_str().unwrap().to_owned();

    let (code, _, _) = run_async(&addr, None, &["bundle", "validate", "u1", &billing]).await;
    assert_eq!(code, 0);

    let (code, stdout, _) = run_async(&addr, None, &["bundle", "validate", "u1", "nope"]).await;
    assert_eq!(code, 1);
    assert!(stdout.contains("not allowed"), "{stdout}");

    let (code, stdout, _) = run_async(&addr, Some(HOOKS_KEY), &["bundle", "get", "u2"]).await;
    assert_eq!(code, 1);
    assert!(stdout.contains("not found"), "{stdout}");
}
