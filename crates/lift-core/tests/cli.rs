//! Smoke tests for the lift binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn snapshot_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write snapshot");
    file
}

#[test]
fn analyze_emits_a_decision_payload() {
    let file = snapshot_file(
        r#"{
            "variants": [
                {"variant_key": "control", "visitors": 100, "conversions": 2},
                {"variant_key": "variant", "visitors": 100, "conversions": 20}
            ]
        }"#,
    );
    Command::cargo_bin("lift")
        .expect("binary")
        .args(["analyze", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"decision_status\":\"ready_to_ship\""))
        .stdout(predicate::str::contains("\"prior_used\":\"platform_default\""));
}

#[test]
fn analyze_rejects_malformed_counts() {
    let file = snapshot_file(
        r#"{"variants": [{"variant_key": "a", "visitors": 5, "conversions": 9}]}"#,
    );
    Command::cargo_bin("lift")
        .expect("binary")
        .args(["analyze", "--input"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceed visitors"));
}

#[test]
fn prior_resolves_from_history() {
    Command::cargo_bin("lift")
        .expect("binary")
        .args(["prior", "--rates", "0.03,0.05,0.04,0.06"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"provenance\":\"project_historical\""));
}

#[test]
fn rope_classifies_identical_variants() {
    let file = snapshot_file(
        r#"{
            "variants": [
                {"variant_key": "a", "visitors": 200, "conversions": 10},
                {"variant_key": "b", "visitors": 200, "conversions": 10}
            ]
        }"#,
    );
    Command::cargo_bin("lift")
        .expect("binary")
        .args(["rope", "--rope-width", "0.05", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"decision\":\"equivalent\""));
}

#[test]
fn calibrate_reports_null_for_thin_history() {
    let file = snapshot_file(
        r#"[{"scroll_depth": 0.5, "time_on_page": 0.5, "click_count": 0.5,
             "form_engagement": 0.0, "converted": 1.0}]"#,
    );
    Command::cargo_bin("lift")
        .expect("binary")
        .args(["calibrate", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}
