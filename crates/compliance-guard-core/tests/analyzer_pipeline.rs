use std::{path::PathBuf, sync::Arc};

use compliance_guard_core::{
    build_client,
    evaluation::{evaluate, load_cases},
    AnalysisError, AnalysisSettings, ComplianceAnalyzer, Judgment, LlmSettings, RiskLevel,
    RuleSet,
};
use httpmock::prelude::*;
use serde_json::json;

const POLICY: &str = "We experienced a major data breach affecting users. Data is shared with third-parties without consent.";

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn sample_rules() -> RuleSet {
    RuleSet::load(workspace_root().join("rules/rules.json")).unwrap()
}

fn groq_settings(server: &MockServer) -> LlmSettings {
    LlmSettings {
        provider: "groq".into(),
        api_key: "test-key".into(),
        endpoint: Some(server.base_url()),
        max_retries: 0,
        ..LlmSettings::default()
    }
}

#[tokio::test]
async fn policy_sentence_is_high_risk_end_to_end() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "Yes, this is a violation."}}]
            }));
        })
        .await;

    let client = build_client(&groq_settings(&server)).unwrap();
    let analyzer = ComplianceAnalyzer::new(sample_rules(), client, AnalysisSettings::default());
    let result = analyzer.analyze_text(POLICY, None).await.unwrap();

    let spans: Vec<_> = result
        .report
        .findings
        .iter()
        .map(|f| (f.rule_id.as_str(), f.span))
        .collect();
    assert_eq!(
        spans,
        vec![
            ("data_breach", (23, 34)),
            ("consent_violation", (86, 101)),
            ("data_sharing", (60, 85)),
        ]
    );
    assert_eq!(result.report.breakdown.score, 6);
    assert_eq!(result.report.risk, RiskLevel::High);
    assert!(result
        .report
        .findings
        .iter()
        .all(|f| matches!(&f.judgment, Some(Judgment::Verdict { text }) if text == "Yes, this is a violation.")));
    assert_eq!(result.summary, "Yes, this is a violation.");
    // Three judgments and one summary.
    assert_eq!(mock.hits_async().await, 4);
}

#[tokio::test]
async fn provider_outage_marks_judgments_and_fails_summary() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).body("internal error");
        })
        .await;

    let client = build_client(&groq_settings(&server)).unwrap();
    let analyzer = ComplianceAnalyzer::new(sample_rules(), client, AnalysisSettings::default());
    let err = analyzer.analyze_text(POLICY, None).await.unwrap_err();

    assert!(matches!(err, AnalysisError::Summary { .. }));
    let partial = err.partial_report().unwrap();
    assert_eq!(partial.findings.len(), 3);
    assert_eq!(partial.risk, RiskLevel::High);
    assert!(partial
        .findings
        .iter()
        .all(|f| f.judgment.as_ref().is_some_and(Judgment::is_failed)));
}

#[tokio::test]
async fn unsupported_document_fails_before_any_model_call() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200);
        })
        .await;

    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("policy.rtf");
    std::fs::write(&path, POLICY).unwrap();

    let client = build_client(&groq_settings(&server)).unwrap();
    let analyzer = ComplianceAnalyzer::new(sample_rules(), client, AnalysisSettings::default());
    let err = analyzer.analyze_file(&path, None).await.unwrap_err();
    assert!(matches!(err, AnalysisError::DocumentLoad(_)));
    assert_eq!(mock.hits_async().await, 0);
}

#[test]
fn labelled_cases_match_sample_rules() {
    let cases = load_cases(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/evaluation_cases.json"),
    )
    .unwrap();
    assert_eq!(cases.len(), 10);

    let analyzer = ComplianceAnalyzer::new(
        sample_rules(),
        build_client(&LlmSettings::noop()).unwrap(),
        AnalysisSettings::default(),
    );
    let summary = evaluate(&analyzer, &cases);

    assert!((summary.risk_accuracy - 0.9).abs() < 1e-9);
    for outcome in summary.cases.iter().filter(|o| o.id != 9) {
        assert_eq!(outcome.f1_score, 1.0, "case {} ({})", outcome.id, outcome.name);
        assert!(outcome.risk_accurate, "case {} ({})", outcome.id, outcome.name);
    }

    let mixed = summary.cases.iter().find(|o| o.id == 9).unwrap();
    assert_eq!(mixed.true_positives, 3);
    assert_eq!(mixed.false_positives, 2);
    assert_eq!(mixed.false_negatives, 1);
    assert_eq!(mixed.detected_risk, RiskLevel::High);

    let breach = summary
        .rule_detection
        .iter()
        .find(|r| r.rule_id == "data_breach")
        .unwrap();
    assert_eq!((breach.detected, breach.expected), (2, 2));
}

#[test]
fn shared_analyzer_is_cheap_to_clone() {
    let analyzer = ComplianceAnalyzer::new(
        sample_rules(),
        Arc::new(compliance_guard_core::llm::NoopLlmClient),
        AnalysisSettings::default(),
    );
    let copy = analyzer.clone();
    assert_eq!(copy.rules().len(), analyzer.rules().len());
    assert_eq!(copy.scan(POLICY).risk, RiskLevel::High);
}
