use std::{fs::write, path::PathBuf};

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;

const POLICY: &str = "We experienced a major data breach affecting users. Data is shared with third-parties without consent.";

const LLM_ENV: [&str; 6] = [
    "COMPLIANCE_GUARD_RULES",
    "COMPLIANCE_GUARD_LLM__PROVIDER",
    "COMPLIANCE_GUARD_LLM__API_KEY",
    "COMPLIANCE_GUARD_LLM__ENDPOINT",
    "COMPLIANCE_GUARD_LLM__MODEL",
    "COMPLIANCE_GUARD_LLM__MAX_RETRIES",
];

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn guard() -> Command {
    let mut cmd = Command::cargo_bin("compliance-guard").unwrap();
    for var in LLM_ENV {
        cmd.env_remove(var);
    }
    cmd.arg("--rules").arg(workspace_root().join("rules/rules.json"));
    cmd
}

fn policy_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    write(&path, POLICY).unwrap();
    path
}

#[test]
fn list_rules_shows_sample_pack() {
    guard()
        .arg("list-rules")
        .assert()
        .success()
        .stdout(contains("8 rule(s) loaded"))
        .stdout(contains("data_breach"))
        .stdout(contains("privacy_policy_missing"));
}

#[test]
fn list_rules_is_the_default_command() {
    guard().assert().success().stdout(contains("consent_violation"));
}

#[test]
fn list_rules_as_json() {
    let output = guard().args(["list-rules", "--json"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rules = value.as_object().unwrap();
    assert_eq!(rules.len(), 8);
    assert_eq!(rules["retention_policy"], "retained forever|no retention policy|no deletion policy");
}

#[test]
fn scan_reports_high_risk_offline() {
    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.txt");
    guard()
        .arg("scan")
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("Risk Level: High (score 6)"))
        .stdout(contains("data_breach @ 23..34"))
        .stdout(contains("Judgment").not());
}

#[test]
fn scan_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.md");
    let output = guard().arg("scan").arg(&path).arg("--json").output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["risk"], "high");
    assert_eq!(value["findings"].as_array().unwrap().len(), 3);
}

#[test]
fn scan_rejects_unsupported_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.rtf");
    guard()
        .arg("scan")
        .arg(&path)
        .assert()
        .failure()
        .stderr(contains("unsupported document format"));
}

#[test]
fn invalid_rule_pack_fails() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("rules.txt");
    write(&rules, "ok_rule | fine\nbroken | (unclosed\n").unwrap();
    let document = policy_file(&dir, "policy.txt");

    let mut cmd = Command::cargo_bin("compliance-guard").unwrap();
    cmd.arg("--rules")
        .arg(&rules)
        .arg("scan")
        .arg(&document)
        .assert()
        .failure()
        .stderr(contains("failed to load rules"))
        .stderr(contains("rule `broken` has an invalid pattern"));
}

#[test]
fn analyze_with_noop_provider_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.txt");
    guard()
        .env("COMPLIANCE_GUARD_LLM__PROVIDER", "noop")
        .arg("analyze")
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("Risk Level: High"))
        .stdout(contains("Judgment: LLM provider not configured"))
        .stdout(contains("Summary:"));
}

#[test]
fn analyze_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.txt");
    let config = dir.path().join("guard.toml");
    write(
        &config,
        "[llm]\nprovider = \"noop\"\nmodel = \"config-model\"\n\n[analysis]\nadjudicate = false\n",
    )
    .unwrap();

    guard()
        .arg("--config")
        .arg(&config)
        .arg("analyze")
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("Summary:"))
        .stdout(contains("Judgment").not());
}

#[test]
fn provider_flag_overrides_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.txt");
    guard()
        .env("COMPLIANCE_GUARD_LLM__PROVIDER", "openai")
        .args(["--provider", "noop", "--timeout", "5s", "analyze"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn analyze_requires_an_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.txt");
    guard()
        .arg("analyze")
        .arg(&path)
        .assert()
        .failure()
        .stderr(contains("API key"));
}

#[test]
fn invalid_timeout_is_rejected() {
    guard()
        .args(["--timeout", "soon", "list-rules"])
        .assert()
        .failure();
}

#[test]
fn zero_timeout_is_rejected() {
    guard()
        .args(["--timeout", "0s", "list-rules"])
        .assert()
        .failure()
        .stderr(contains("timeout must be at least 1ms"));
}

#[test]
fn inverted_thresholds_fail_before_scanning() {
    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.txt");
    guard()
        .env("COMPLIANCE_GUARD_ANALYSIS__MEDIUM_THRESHOLD", "0")
        .arg("scan")
        .arg(&path)
        .assert()
        .failure()
        .stderr(contains("invalid risk thresholds"))
        .stdout(contains("Risk Level").not());
}

#[test]
fn summary_failure_prints_partial_report() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(500).body("upstream exploded");
    });

    let dir = tempfile::tempdir().unwrap();
    let path = policy_file(&dir, "policy.txt");
    guard()
        .env("COMPLIANCE_GUARD_LLM__PROVIDER", "groq")
        .env("COMPLIANCE_GUARD_LLM__API_KEY", "test-key")
        .env("COMPLIANCE_GUARD_LLM__ENDPOINT", server.base_url())
        .env("COMPLIANCE_GUARD_LLM__MAX_RETRIES", "0")
        .args(["analyze", "--skip-adjudication"])
        .arg(&path)
        .assert()
        .failure()
        .stdout(contains("Risk Level: High"))
        .stdout(contains("Summary:").not())
        .stderr(contains("summary generation failed"))
        .stderr(contains("upstream exploded"));
}

#[test]
fn evaluate_reports_accuracy() {
    let cases = workspace_root().join("crates/compliance-guard-core/tests/fixtures/evaluation_cases.json");
    guard()
        .arg("evaluate")
        .arg(&cases)
        .assert()
        .success()
        .stdout(contains("Cases evaluated: 10"))
        .stdout(contains("Risk Level Accuracy: 0.900"))
        .stdout(contains("Mixed Compliance Issues"));
}
