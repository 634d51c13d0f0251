//! Integration tests for npm dependency overrides.
//!
//! A mock registry is served with axum; npm itself is replaced by a scripted
//! runner that records every invocation.

use async_trait::async_trait;
use axum::extract::Path as UrlPath;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pak_core::pkg::{
    pkg_codes, CommandRunner, DependencyResolver, Invocation, Npm, PackageManager,
    ProcessOutcome, RegistryClient, Session,
};
use pak_core::Config;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

async fn handle_packument(UrlPath(name): UrlPath<String>) -> Response {
    match name.as_str() {
        "is-odd" => Json(json!({
            "name": "is-odd",
            "versions": {
                "0.1.2": {
                    "version": "0.1.2",
                    "dependencies": { "is-number": "^3.0.0" },
                    "dist": { "tarball": "https://registry.example/is-odd-0.1.2.tgz" }
                },
                "3.0.1": {
                    "version": "3.0.1",
                    "dependencies": { "is-number": "^6.0.0" },
                    "dist": {
                        "integrity": "sha512-odd301",
                        "tarball": "https://registry.example/is-odd-3.0.1.tgz"
                    }
                }
            }
        }))
        .into_response(),
        "@scope/pkg" => Json(json!({
            "name": "@scope/pkg",
            "versions": {
                "1.0.0": {
                    "version": "1.0.0",
                    "dist": { "tarball": "https://registry.example/pkg-1.0.0.tgz" }
                }
            }
        }))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Start the mock registry and return its base URL.
async fn start_mock_registry() -> String {
    let app = Router::new().route("/:name", get(handle_packument));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[derive(Debug, Clone)]
struct Call {
    args: Vec<String>,
    cwd: PathBuf,
    /// Lockfile content at the time of the call.
    lockfile: Option<String>,
}

/// Stands in for npm. Every call succeeds.
struct ScriptedNpm {
    lockfile: PathBuf,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedNpm {
    fn new(lockfile: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            lockfile,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedNpm {
    async fn run(&self, invocation: Invocation<'_>) -> io::Result<ProcessOutcome> {
        self.calls.lock().unwrap().push(Call {
            args: invocation.args.to_vec(),
            cwd: invocation.cwd.to_path_buf(),
            lockfile: fs::read_to_string(&self.lockfile).ok(),
        });
        Ok(ProcessOutcome::exited(0, "ok", ""))
    }
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap() + "\n").unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// A v2 project: root depends on is-odd and is-even, is-even depends on is-odd.
fn create_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_json(
        &root.join("package.json"),
        &json!({
            "name": "test",
            "version": "1.0.0",
            "dependencies": { "is-even": "^1.0.0", "is-odd": "^0.1.2" }
        }),
    );
    write_json(
        &root.join("node_modules/is-even/package.json"),
        &json!({
            "name": "is-even",
            "version": "1.0.0",
            "dependencies": { "is-odd": "^0.1.2" }
        }),
    );
    write_json(
        &root.join("package-lock.json"),
        &json!({
            "name": "test",
            "version": "1.0.0",
            "lockfileVersion": 2,
            "requires": true,
            "packages": {
                "": {
                    "name": "test",
                    "version": "1.0.0",
                    "dependencies": { "is-even": "^1.0.0", "is-odd": "^0.1.2" }
                },
                "node_modules/is-even": {
                    "version": "1.0.0",
                    "dependencies": { "is-odd": "^0.1.2" }
                },
                "node_modules/is-odd": {
                    "version": "0.1.2",
                    "resolved": "https://registry.example/is-odd-0.1.2.tgz",
                    "integrity": "sha512-old",
                    "dependencies": { "is-number": "^3.0.0" }
                }
            },
            "dependencies": {
                "is-even": {
                    "version": "1.0.0",
                    "requires": { "is-odd": "^0.1.2" }
                },
                "is-odd": {
                    "version": "0.1.2",
                    "resolved": "https://registry.example/is-odd-0.1.2.tgz",
                    "integrity": "sha512-old",
                    "requires": { "is-number": "^3.0.0" }
                }
            }
        }),
    );
    fs::create_dir_all(root.join("src")).unwrap();
    dir
}

fn npm_in(cwd: PathBuf, registry: &str, runner: Arc<ScriptedNpm>) -> Npm {
    let config = Config::new(cwd).with_registry(Some(registry.to_string()));
    Npm::with_session(Session::new(config).with_runner(runner))
}

#[tokio::test]
async fn test_registry_client_resolves_versions() {
    let registry = start_mock_registry().await;
    let client = RegistryClient::new(&registry).unwrap();

    let resolved = client.resolve("is-odd", "3.0.1").await.unwrap();
    assert_eq!(resolved.version, "3.0.1");
    assert_eq!(resolved.integrity.as_deref(), Some("sha512-odd301"));
    assert_eq!(resolved.tarball, "https://registry.example/is-odd-3.0.1.tgz");

    let scoped = client.resolve("@scope/pkg", "1.0.0").await.unwrap();
    assert!(scoped.integrity.is_none());
    assert!(scoped.dependencies.is_empty());
}

#[tokio::test]
async fn test_registry_client_errors() {
    let registry = start_mock_registry().await;
    let client = RegistryClient::new(&registry).unwrap();

    let err = client.resolve("is-odd", "9.9.9").await.unwrap_err();
    assert_eq!(err.code(), pkg_codes::PKG_VERSION_NOT_FOUND);
    assert_eq!(err.message(), "is-odd@9.9.9 was not found in the npm registry!");

    let err = client.resolve("does-not-exist", "1.0.0").await.unwrap_err();
    assert_eq!(err.code(), pkg_codes::PKG_NOT_FOUND);
}

#[tokio::test]
async fn test_registry_unreachable() {
    // Nothing listens on port 9 (discard) on a test machine
    let client = RegistryClient::new("http://127.0.0.1:9").unwrap();
    let err = client.resolve("is-odd", "3.0.1").await.unwrap_err();
    assert_eq!(err.code(), pkg_codes::PKG_REGISTRY_ERROR);
    assert!(err
        .message()
        .starts_with("Failed to download package info from npm registry"));
}

#[tokio::test]
async fn test_override_patches_files_then_installs_in_root() {
    let registry = start_mock_registry().await;
    let project = create_project();
    let root = project.path();
    let runner = ScriptedNpm::new(root.join("package-lock.json"));

    let npm = npm_in(root.join("src"), &registry, runner.clone());
    let mut deps = BTreeMap::new();
    deps.insert("is-odd".to_string(), "3.0.1".to_string());
    let result = npm.override_dependencies(&deps).await;
    assert!(result.success, "{}", result.stderr);

    // Direct dependencies pinned in every affected manifest
    let manifest = read_json(&root.join("package.json"));
    assert_eq!(manifest["dependencies"]["is-odd"], "3.0.1");
    assert_eq!(manifest["dependencies"]["is-even"], "^1.0.0");
    let nested = read_json(&root.join("node_modules/is-even/package.json"));
    assert_eq!(nested["dependencies"]["is-odd"], "3.0.1");

    // Both lockfile layouts rewritten
    let lock = read_json(&root.join("package-lock.json"));
    let odd = &lock["packages"]["node_modules/is-odd"];
    assert_eq!(odd["version"], "3.0.1");
    assert_eq!(odd["resolved"], "https://registry.example/is-odd-3.0.1.tgz");
    assert_eq!(odd["integrity"], "sha512-odd301");
    assert_eq!(odd["dependencies"], json!({ "is-number": "^6.0.0" }));
    assert_eq!(lock["dependencies"]["is-odd"]["version"], "3.0.1");
    assert_eq!(lock["dependencies"]["is-even"]["requires"]["is-odd"], "3.0.1");

    // install, then dedupe, both in the root and after the lockfile was written
    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].args, vec!["install", "--production"]);
    assert_eq!(calls[1].args, vec!["dedupe"]);
    for call in &calls {
        assert_eq!(call.cwd, root);
        assert!(call.lockfile.as_deref().unwrap_or("").contains("sha512-odd301"));
    }
}

#[tokio::test]
async fn test_override_of_unknown_version_changes_nothing() {
    let registry = start_mock_registry().await;
    let project = create_project();
    let root = project.path();
    let lock_before = fs::read_to_string(root.join("package-lock.json")).unwrap();
    let manifest_before = fs::read_to_string(root.join("package.json")).unwrap();
    let runner = ScriptedNpm::new(root.join("package-lock.json"));

    let npm = npm_in(root.to_path_buf(), &registry, runner.clone());
    let mut deps = BTreeMap::new();
    deps.insert("is-odd".to_string(), "3.0.1".to_string());
    deps.insert("is-even".to_string(), "7.7.7".to_string());
    let result = npm.override_dependencies(&deps).await;

    assert!(!result.success);
    assert!(result.stderr.contains("was not found in the npm registry"));
    assert_eq!(
        fs::read_to_string(root.join("package-lock.json")).unwrap(),
        lock_before
    );
    assert_eq!(
        fs::read_to_string(root.join("package.json")).unwrap(),
        manifest_before
    );
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_override_keeps_lockfile_when_a_manifest_cannot_be_pinned() {
    let registry = start_mock_registry().await;
    let project = create_project();
    let root = project.path();
    fs::write(root.join("node_modules/is-even/package.json"), "{").unwrap();
    let lock_before = fs::read_to_string(root.join("package-lock.json")).unwrap();
    let runner = ScriptedNpm::new(root.join("package-lock.json"));

    let npm = npm_in(root.to_path_buf(), &registry, runner.clone());
    let mut deps = BTreeMap::new();
    deps.insert("is-odd".to_string(), "3.0.1".to_string());
    let result = npm.override_dependencies(&deps).await;

    assert!(!result.success);
    assert!(
        result.stderr.starts_with("Error updating package files:"),
        "{}",
        result.stderr
    );
    assert_eq!(
        fs::read_to_string(root.join("package-lock.json")).unwrap(),
        lock_before
    );
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_override_twice_is_stable() {
    let registry = start_mock_registry().await;
    let project = create_project();
    let root = project.path();
    let runner = ScriptedNpm::new(root.join("package-lock.json"));
    let npm = npm_in(root.to_path_buf(), &registry, runner);

    let mut deps = BTreeMap::new();
    deps.insert("is-odd".to_string(), "3.0.1".to_string());

    assert!(npm.override_dependencies(&deps).await.success);
    let lock_once = fs::read_to_string(root.join("package-lock.json")).unwrap();
    let manifest_once = fs::read_to_string(root.join("package.json")).unwrap();

    assert!(npm.override_dependencies(&deps).await.success);
    assert_eq!(
        fs::read_to_string(root.join("package-lock.json")).unwrap(),
        lock_once
    );
    assert_eq!(
        fs::read_to_string(root.join("package.json")).unwrap(),
        manifest_once
    );
}
