use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn slipway() -> assert_cmd::Command {
    cargo_bin_cmd!("slipway")
}

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// A built app with one function and a two-page static site.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "api/dist/functions/graphql.js",
        "const db = require('../lib/db');\nexports.handler = async () => db;",
    );
    write(root, "api/dist/lib/db.js", "module.exports = {};");
    write(root, "web/dist/index.html", "<html></html>");
    write(root, "web/dist/about.html", "<html></html>");
    tmp
}

// ── Help / Version ──

#[test]
fn shows_help() {
    slipway()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Package serverless functions"));
}

#[test]
fn shows_version() {
    slipway()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("slipway"));
}

#[test]
fn unknown_command_fails() {
    slipway().arg("deploy").assert().failure();
}

// ── Package Command ──

#[test]
fn package_prints_summary() {
    let tmp = project();

    slipway()
        .args(["package", "--dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Packaged 1 function(s) and 2 static asset(s)"))
        .stdout(predicate::str::contains("api/graphql  graphql.handler  (2 files"))
        .stdout(predicate::str::contains("Fallback: /(.*) -> /index"));
}

#[test]
fn package_json_is_the_manifest() {
    let tmp = project();

    let output = slipway()
        .args(["package", "--json", "--dir"])
        .arg(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outputs"]["api/graphql"]["handler"], "graphql.handler");
    assert_eq!(
        json["outputs"]["api/graphql"]["files"],
        serde_json::json!(["api/dist/functions/graphql.js", "api/dist/lib/db.js"])
    );
    assert_eq!(json["outputs"]["about"]["request_path"], "/about");
    assert_eq!(json["routes"][0]["destination"], "/index");
}

#[test]
fn package_writes_manifest_file() {
    let tmp = project();
    let out = tmp.path().join("manifest.json");

    slipway()
        .args(["package", "--parallel", "--dir"])
        .arg(tmp.path())
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest written to"));

    let content = std::fs::read_to_string(&out).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(json["outputs"]["api/graphql"].is_object());
}

#[test]
fn package_reports_absolute_paths_from_default_dir() {
    let tmp = project();

    let output = slipway()
        .args(["package", "--json"])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let file = Path::new(json["outputs"]["about"]["file"].as_str().unwrap());
    let root = std::fs::canonicalize(tmp.path()).unwrap();
    assert!(file.is_absolute(), "got: {}", file.display());
    assert_eq!(file, root.join("web/dist/about.html"));
}

#[test]
fn package_fails_on_missing_dir() {
    let tmp = TempDir::new().unwrap();

    slipway()
        .args(["package", "--dir"])
        .arg(tmp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("project directory"));
}

#[test]
fn package_reports_omitted_functions() {
    let tmp = project();
    write(tmp.path(), "api/dist/functions/dist/dist.js", "");

    slipway()
        .args(["package", "--dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Omitted 1 function(s):"))
        .stdout(predicate::str::contains("api/dist/dist"));
}

#[test]
fn package_fails_on_name_collision() {
    let tmp = project();
    write(tmp.path(), "api/dist/functions/graphql.mjs", "export const handler = 1;");

    slipway()
        .args(["package", "--dir"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("collides"));
}

#[test]
fn package_fails_on_invalid_config() {
    let tmp = project();
    write(tmp.path(), "slipway.toml", "[functions]\nmemory = 0\n");

    slipway()
        .args(["package", "--dir"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("memory"));
}

// ── Routes Command ──

#[test]
fn routes_uses_catch_all_document_when_present() {
    let tmp = project();
    write(tmp.path(), "web/dist/200.html", "<html></html>");

    slipway()
        .args(["routes", "--dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("/(.*) -> /200"))
        .stdout(predicate::str::contains("src: ^/(.*)$"));
}

#[test]
fn routes_respects_configured_static_dir() {
    let tmp = project();
    write(
        tmp.path(),
        "slipway.toml",
        "[layout]\nstatic_dir = \"public\"\n\n[routes]\nfallback_document = \"404.html\"\n",
    );
    write(tmp.path(), "public/404.html", "");

    slipway()
        .args(["routes", "--dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("/(.*) -> /404"));
}
