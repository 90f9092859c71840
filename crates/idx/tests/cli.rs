//! End-to-end tests for the `idx` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn index_command_prints_the_id_term() {
    let dir = TempDir::new().unwrap();
    let doc_path = dir.path().join("doc.json");
    std::fs::write(&doc_path, r#"{"title": "hello world"}"#).unwrap();

    Command::cargo_bin("idx")
        .unwrap()
        .args(["index", doc_path.to_str().unwrap(), "--id", "doc-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Qdoc-1"));
}

#[test]
fn index_command_reports_missing_files() {
    Command::cargo_bin("idx")
        .unwrap()
        .args(["index", "/no/such/file.json", "--id", "doc-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn index_command_persists_to_a_volume_when_requested() {
    let dir = TempDir::new().unwrap();
    let doc_path = dir.path().join("doc.json");
    std::fs::write(&doc_path, r#"{"title": "hello world"}"#).unwrap();
    let volume_path = dir.path().join("docs.0");

    Command::cargo_bin("idx")
        .unwrap()
        .args(["index", doc_path.to_str().unwrap(), "--id", "doc-1", "--volume", volume_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("volume_offset"));
}

#[test]
fn config_command_prints_defaults() {
    Command::cargo_bin("idx")
        .unwrap()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("strict"));
}
