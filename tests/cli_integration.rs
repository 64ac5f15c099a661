//! CLI integration tests for Trellis.
//!
//! These tests run the binary against a temporary workspace with
//! pre-produced metadata records, so no build tool is needed.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the trellis binary command.
fn trellis() -> Command {
    Command::cargo_bin("trellis").unwrap()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A workspace with //app (binary and test), //lib, an empty //util package
/// and three maven jars.
fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    write(root, "MODULE.bazel", "module(name = \"demo\")\n");
    write(root, "app/BUILD", "");
    write(root, "lib/BUILD.bazel", "");
    write(root, "util/BUILD", "");

    write(
        root,
        "meta/app.trellis-info.json",
        r#"{
            "label": "//app:app",
            "kind": "java_binary",
            "deps": ["//lib:lib", "@maven//:guava"],
            "runtime_deps": ["@maven//:slf4j"]
        }"#,
    );
    write(
        root,
        "meta/app_test.trellis-info.json",
        r#"{
            "label": "//app:app_test",
            "kind": "java_test",
            "deps": ["//app:app", "@maven//:junit"]
        }"#,
    );
    write(
        root,
        "meta/lib.trellis-info.json",
        r#"{"label": "//lib:lib", "kind": "java_library", "deps": ["@maven//:guava"]}"#,
    );
    write(
        root,
        "meta/maven/guava.trellis-info.json",
        r#"{
            "label": "@maven//:guava",
            "kind": "jvm_import",
            "jars": [{"jar": "external/maven/guava.jar", "source_jar": "external/maven/guava-sources.jar"}]
        }"#,
    );
    write(
        root,
        "meta/maven/slf4j.trellis-info.json",
        r#"{"label": "@maven//:slf4j", "kind": "jvm_import", "jars": [{"jar": "external/maven/slf4j.jar"}]}"#,
    );
    write(
        root,
        "meta/maven/junit.trellis-info.json",
        r#"{"label": "@maven//:junit", "kind": "jvm_import", "jars": [{"jar": "external/maven/junit.jar"}]}"#,
    );

    for jar in ["guava.jar", "guava-sources.jar", "slf4j.jar", "junit.jar"] {
        write(root, &format!("external/maven/{}", jar), "");
    }

    write(root, "bazel-bin/tools/runner.jar", "");
    write(
        root,
        ".trellis/config.toml",
        "[implicit]\ntest_runner = [\"tools/runner.jar\"]\n",
    );

    tmp
}

/// Command with the workspace and metadata directory set.
fn trellis_in(ws: &TempDir) -> Command {
    let mut cmd = trellis();
    cmd.arg("--workspace")
        .arg(ws.path())
        .args(["--metadata-dir", "meta"])
        .env_remove("TRELLIS_BAZEL");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap()
}

// ============================================================================
// trellis --help
// ============================================================================

#[test]
fn test_help_lists_commands() {
    trellis()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("packages"))
        .stdout(predicate::str::contains("classpath"))
        .stdout(predicate::str::contains("analyze"));
}

// ============================================================================
// trellis packages
// ============================================================================

#[test]
fn test_packages_lists_all() {
    let ws = workspace();

    trellis_in(&ws)
        .arg("packages")
        .assert()
        .success()
        .stdout("//app\n//lib\n//util\n");
}

#[test]
fn test_packages_with_scope() {
    let ws = workspace();

    trellis_in(&ws)
        .args(["--scope", "//lib", "packages"])
        .assert()
        .success()
        .stdout("//lib\n");
}

#[test]
fn test_packages_with_ignore() {
    let ws = workspace();

    trellis_in(&ws)
        .args(["--ignore", "util,docs", "packages"])
        .assert()
        .success()
        .stdout("//app\n//lib\n");
}

#[test]
fn test_relative_scope_rejected() {
    let ws = workspace();

    trellis_in(&ws)
        .args(["--scope", "lib", "packages"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a concrete package label"));
}

#[test]
fn test_unknown_scope_fails() {
    let ws = workspace();

    trellis_in(&ws)
        .args(["--scope", "//nope", "packages"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("matches no packages"));
}

#[test]
fn test_missing_workspace_fails() {
    let tmp = TempDir::new().unwrap();

    trellis()
        .arg("--workspace")
        .arg(tmp.path().join("missing"))
        .args(["--metadata-dir", "meta", "packages"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workspace directory does not exist"));
}

// ============================================================================
// trellis roots / order
// ============================================================================

#[test]
fn test_roots() {
    let ws = workspace();

    trellis_in(&ws)
        .arg("roots")
        .assert()
        .success()
        .stdout("//app:app_test\n");
}

#[test]
fn test_order_dependencies_first() {
    let ws = workspace();

    let stdout = stdout_of(trellis_in(&ws).arg("order"));
    let lib = stdout.find("//lib").unwrap();
    let app = stdout.find("//app").unwrap();
    assert!(lib < app, "unexpected order:\n{}", stdout);
    assert!(stdout.contains("//util"));
    assert!(!stdout.contains("cycle"));
}

#[test]
fn test_order_reports_cycle() {
    let ws = workspace();
    write(
        ws.path(),
        "meta/lib.trellis-info.json",
        r#"{"label": "//lib:lib", "kind": "java_library", "deps": ["//app:app"]}"#,
    );

    trellis_in(&ws)
        .arg("order")
        .assert()
        .success()
        .stdout(predicate::str::contains("cycle detected between packages"))
        .stdout(predicate::str::contains("//app -> //lib -> //app"));
}

#[test]
fn test_dangling_reference_fails() {
    let ws = workspace();
    fs::remove_file(ws.path().join("meta/maven/junit.trellis-info.json")).unwrap();

    trellis_in(&ws)
        .arg("roots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("dangling dependency from `//app:app_test`"))
        .stderr(predicate::str::contains("@maven//:junit"));
}

// ============================================================================
// trellis classpath
// ============================================================================

#[test]
fn test_classpath_for_project() {
    let ws = workspace();

    trellis_in(&ws)
        .args(["classpath", "--project", "//app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("//app (complete)"))
        .stdout(predicate::str::contains("projects:\n    //lib"))
        .stdout(predicate::str::contains("guava.jar [source]"))
        .stdout(predicate::str::contains("slf4j.jar [runtime]"))
        .stdout(predicate::str::contains("junit.jar [test]"))
        .stdout(predicate::str::contains("runner.jar [test, runtime]"))
        .stdout(predicate::str::contains("//lib (").not());
}

#[test]
fn test_classpath_json() {
    let ws = workspace();

    let stdout = stdout_of(trellis_in(&ws).args(["classpath", "--json"]));
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    let projects = json.as_array().unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0]["project"], "//app");
    assert_eq!(projects[0]["classpath"]["is_complete"], true);
    assert_eq!(projects[0]["classpath"]["project_refs"][0]["name"], "//lib");
    assert_eq!(projects[1]["project"], "//lib");
}

#[test]
fn test_missing_artifact_is_incomplete_not_failure() {
    let ws = workspace();
    fs::remove_file(ws.path().join("external/maven/slf4j.jar")).unwrap();

    trellis_in(&ws)
        .args(["classpath", "--project", "//app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("//app (incomplete)"))
        .stdout(predicate::str::contains("unresolved:\n    @maven//:slf4j"));
}

#[test]
fn test_unknown_project_fails() {
    let ws = workspace();

    trellis_in(&ws)
        .args(["classpath", "--project", "//util"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no project named `//util`"));
}

// ============================================================================
// trellis analyze
// ============================================================================

#[test]
fn test_analyze_report() {
    let ws = workspace();

    trellis_in(&ws)
        .arg("analyze")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workspace: demo"))
        .stdout(predicate::str::contains("Targets: 6 in 3 packages"))
        .stdout(predicate::str::contains("Summary: 2 projects, 0 incomplete"));
}

#[test]
fn test_analyze_json() {
    let ws = workspace();

    let stdout = stdout_of(trellis_in(&ws).args(["--scope", "//app", "analyze", "--json"]));
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["workspace"], "demo");
    assert_eq!(json["scope"], "//app");
    assert_eq!(json["packages"], serde_json::json!(["//app"]));
    assert_eq!(json["roots"], serde_json::json!(["//app:app_test"]));
    assert_eq!(json["projects"].as_array().unwrap().len(), 1);
}

/// A stand-in bazel that answers `info` and `--announce_rc` for a workspace.
#[cfg(unix)]
fn fake_bazel(dir: &Path, exec_root: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("bazel");
    let script = format!(
        r#"#!/bin/sh
case "$1" in
  info) echo "execution_root: {root}"; echo "bazel-bin: {root}/bazel-bin" ;;
  build) echo "INFO: Reading rc options for 'build' from {root}/.bazelrc:" >&2
         echo "  'build' options: --javacopt=-Werror --java_language_version=17" >&2 ;;
esac
"#,
        root = exec_root.display()
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn test_analyze_reports_bazel_options() {
    let ws = workspace();
    let tools = TempDir::new().unwrap();
    let bazel = fake_bazel(tools.path(), ws.path());

    let stdout = stdout_of(trellis_in(&ws).arg("--bazel").arg(&bazel).args(["analyze", "--json"]));
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        json["bazel_options"]["build"],
        serde_json::json!(["--javacopt=-Werror", "--java_language_version=17"])
    );
    assert_eq!(json["projects"][0]["classpath"]["is_complete"], true);

    trellis_in(&ws)
        .arg("--bazel")
        .arg(&bazel)
        .arg("analyze")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Bazel options:\n  build: --javacopt=-Werror --java_language_version=17\n",
        ));
}

#[cfg(unix)]
#[test]
fn test_jars_resolve_against_reported_execution_root() {
    let ws = workspace();
    let tools = TempDir::new().unwrap();
    // An execution root without the maven jars
    let bazel = fake_bazel(tools.path(), tools.path());

    trellis_in(&ws)
        .arg("--bazel")
        .arg(&bazel)
        .args(["classpath", "--project", "//lib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("//lib (incomplete)"))
        .stdout(predicate::str::contains("unresolved:\n    @maven//:guava"));
}

#[test]
fn test_analyze_without_bazel_has_no_options() {
    let ws = workspace();

    let stdout = stdout_of(trellis_in(&ws).args(["analyze", "--json"]));
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(json["bazel_options"].is_null());
    assert_eq!(json["target_cycles"], serde_json::json!([]));
}
