use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

fn tcov_binary_path() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_tcov"))
}

const SNAPSHOT: &str = r#"{
    "project": "webshop",
    "test_cases": [
        {"identifier": "g-login", "name": "Login", "path": "Test Cases/Auth/Login.tc"},
        {"identifier": "g-tc1", "name": "TC1", "path": "Test Cases/Main/TC1.tc", "tags": "smoke"},
        {"identifier": "g-tc2", "name": "TC2", "path": "Test Cases/Main/TC2.tc", "tags": "smoke"},
        {"identifier": "g-tc3", "name": "TC3", "path": "Test Cases/Main/TC3.tc"}
    ],
    "suites": [
        {"identifier": "s1", "name": "S1", "path": "Test Suites/S1.ts", "kind": "static",
         "case_refs": ["g-tc2", "g-tc3", "g-missing"]},
        {"identifier": "d1", "name": "D1", "path": "Test Suites/D1.ts", "kind": "dynamic",
         "filter_text": "name=(TC1)"},
        {"identifier": "c1", "name": "C1", "path": "Test Suites/C1.ts", "kind": "collection",
         "entries": [
            {"suite_path": "Test Suites/S1", "profile": "P1"},
            {"suite_path": "Test Suites/S1", "profile": "P2"},
            {"suite_path": "Test Suites/D1", "profile": "P1"}
         ]}
    ]
}"#;

fn write_snapshot(dir: &Path) -> PathBuf {
    let path = dir.join("snapshot.json");
    fs::write(&path, SNAPSHOT).expect("write snapshot");
    path
}

#[test]
fn test_cli_writes_report_and_store() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let snapshot_path = write_snapshot(temp_dir.path());
    let report_path = temp_dir.path().join("report.json");
    let db_path = temp_dir.path().join("tcov.sqlite");

    let output = Command::new(tcov_binary_path())
        .arg("--snapshot")
        .arg(&snapshot_path)
        .arg("--output")
        .arg(&report_path)
        .arg("--db")
        .arg(&db_path)
        .output()
        .expect("run tcov");

    assert_eq!(output.status.code(), Some(0), "case=exit_code_without_strict");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("WARN kind=dangling_reference entity=S1"),
        "case=warning_on_stderr stderr={stderr}"
    );

    let report: Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("read report"))
            .expect("decode report");
    assert_eq!(report["coverage"]["totals"]["covered_cases"], 3);
    assert_eq!(report["coverage"]["totals"]["coverage_pct"], 75.0);
    assert_eq!(report["coverage"]["totals"]["total_executions"], 5);
    assert_eq!(report["diagnostics"].as_array().map(Vec::len), Some(1));

    let conn = rusqlite::Connection::open(&db_path).expect("open store");
    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM test_suite_case_links", [], |row| row.get(0))
        .expect("count links");
    assert_eq!(links, 3);
}

#[test]
fn test_cli_prints_each_warning_once() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let snapshot_path = write_snapshot(temp_dir.path());

    let output = Command::new(tcov_binary_path())
        .arg("--snapshot")
        .arg(&snapshot_path)
        .env_remove("RUST_LOG")
        .output()
        .expect("run tcov");

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.matches("kind=dangling_reference").count(),
        1,
        "case=single_warning_channel stderr={stderr}"
    );
}

#[test]
fn test_cli_strict_mode_fails_on_warnings() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let snapshot_path = write_snapshot(temp_dir.path());

    let output = Command::new(tcov_binary_path())
        .arg("--snapshot")
        .arg(&snapshot_path)
        .arg("--strict")
        .output()
        .expect("run tcov");

    assert_eq!(output.status.code(), Some(1), "case=strict_with_warnings");
    let stdout: Value = serde_json::from_slice(&output.stdout).expect("report on stdout");
    assert_eq!(stdout["project"], "webshop");
}

#[test]
fn test_cli_rejects_invalid_module_depth() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let snapshot_path = write_snapshot(temp_dir.path());

    let output = Command::new(tcov_binary_path())
        .arg("--snapshot")
        .arg(&snapshot_path)
        .arg("--module-depth")
        .arg("0")
        .output()
        .expect("run tcov");

    assert_eq!(output.status.code(), Some(2), "case=invalid_depth");
    assert!(output.stdout.is_empty(), "case=no_report_on_config_error");
}

#[test]
fn test_cli_config_file_sets_depth() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let snapshot_path = write_snapshot(temp_dir.path());
    let config_path = temp_dir.path().join("tcov.toml");
    fs::write(&config_path, "module_depth = 1\n").expect("write config");

    let output = Command::new(tcov_binary_path())
        .arg("--snapshot")
        .arg(&snapshot_path)
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("run tcov");

    assert_eq!(output.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&output.stdout).expect("report on stdout");
    assert_eq!(report["coverage"]["module_depth"], 1);
    assert_eq!(report["coverage"]["modules"][0]["module"], "Test Cases");
}

#[test]
fn test_cli_missing_snapshot_is_io_failure() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");

    let output = Command::new(tcov_binary_path())
        .arg("--snapshot")
        .arg(temp_dir.path().join("absent.json"))
        .output()
        .expect("run tcov");

    assert_eq!(output.status.code(), Some(3), "case=missing_snapshot");
}

#[test]
fn test_cli_usage_error() {
    let output = Command::new(tcov_binary_path())
        .arg("--frobnicate")
        .output()
        .expect("run tcov");

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown option: --frobnicate"));
}
