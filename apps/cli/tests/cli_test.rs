//! End-to-end CLI tests against the mock provider.

use assert_cmd::Command;
use predicates::prelude::*;

fn slidesmith() -> Command {
    Command::cargo_bin("slidesmith").expect("binary builds")
}

#[test]
fn skills_list_shows_the_standard_skills() {
    slidesmith()
        .args(["skills", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("research"))
        .stdout(predicate::str::contains("outline"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn skills_help_prints_parameters() {
    slidesmith()
        .args(["skills", "help", "research"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/research"))
        .stdout(predicate::str::contains("topic"));
}

#[test]
fn skills_help_unknown_name_fails() {
    slidesmith()
        .args(["skills", "help", "nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown skill"));
}

#[test]
fn config_defaults_to_the_mock_provider() {
    slidesmith()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("provider   = mock"));
}

#[test]
fn generate_with_mock_provider_completes() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("record.json");

    slidesmith()
        .args([
            "generate",
            "--topic",
            "Quarterly results",
            "--slides",
            "3",
            "--no-images",
            "--output",
        ])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("100%"))
        .stdout(predicate::str::contains("Generated"));

    assert!(output.exists());
    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(record["request"]["topic"], "Quarterly results");
    assert!(record["content"].is_object());
}

#[test]
fn pipeline_with_mock_provider_reports_step_counts() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("deck.json");

    slidesmith()
        .args(["pipeline", "--topic", "Quarterly results", "--slides", "3", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("4/4 steps completed"));

    assert!(output.exists());
}
