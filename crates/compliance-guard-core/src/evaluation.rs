//! Labelled-case evaluation of rule detection and risk assessment.

use std::{collections::BTreeSet, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{analyzer::ComplianceAnalyzer, risk::RiskLevel};

/// A document with the rule ids and risk level it is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationCase {
    pub id: u32,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub expected_violations: Vec<String>,
    pub expected_risk: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub id: u32,
    pub name: String,
    pub expected_violations: Vec<String>,
    /// Distinct rule ids detected, in order of first finding.
    pub detected_violations: Vec<String>,
    pub expected_risk: RiskLevel,
    pub detected_risk: RiskLevel,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub risk_accurate: bool,
}

/// How often an expected rule id was actually detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDetection {
    pub rule_id: String,
    pub expected: usize,
    pub detected: usize,
    pub detection_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub cases: Vec<CaseOutcome>,
    pub average_precision: f64,
    pub average_recall: f64,
    pub average_f1: f64,
    pub risk_accuracy: f64,
    pub rule_detection: Vec<RuleDetection>,
}

/// Read cases from a JSON array.
pub fn load_cases(path: impl AsRef<Path>) -> Result<Vec<EvaluationCase>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read evaluation cases from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse evaluation cases in {}", path.display()))
}

/// Run the offline scan over every case and score the results.
#[instrument(name = "evaluate_cases", skip_all, fields(cases = cases.len()))]
pub fn evaluate(analyzer: &ComplianceAnalyzer, cases: &[EvaluationCase]) -> EvaluationSummary {
    let outcomes: Vec<CaseOutcome> = cases
        .iter()
        .map(|case| evaluate_case(analyzer, case))
        .collect();

    let mean = |value: fn(&CaseOutcome) -> f64| {
        if outcomes.is_empty() {
            0.0
        } else {
            outcomes.iter().map(value).sum::<f64>() / outcomes.len() as f64
        }
    };

    EvaluationSummary {
        average_precision: mean(|o| o.precision),
        average_recall: mean(|o| o.recall),
        average_f1: mean(|o| o.f1_score),
        risk_accuracy: mean(|o| if o.risk_accurate { 1.0 } else { 0.0 }),
        rule_detection: rule_detection(&outcomes),
        cases: outcomes,
    }
}

fn evaluate_case(analyzer: &ComplianceAnalyzer, case: &EvaluationCase) -> CaseOutcome {
    let report = analyzer.scan(&case.content);

    let mut detected_violations: Vec<String> = Vec::new();
    for finding in &report.findings {
        if !detected_violations.contains(&finding.rule_id) {
            detected_violations.push(finding.rule_id.clone());
        }
    }

    let expected: BTreeSet<&str> = case.expected_violations.iter().map(String::as_str).collect();
    let detected: BTreeSet<&str> = detected_violations.iter().map(String::as_str).collect();
    let true_positives = expected.intersection(&detected).count();
    let false_positives = detected.difference(&expected).count();
    let false_negatives = expected.difference(&detected).count();
    let (precision, recall, f1_score) =
        detection_scores(true_positives, false_positives, false_negatives);

    debug!(
        case = case.id,
        true_positives, false_positives, false_negatives, risk = %report.risk,
        "evaluated case"
    );

    CaseOutcome {
        id: case.id,
        name: case.name.clone(),
        expected_violations: case.expected_violations.clone(),
        detected_violations,
        expected_risk: case.expected_risk,
        detected_risk: report.risk,
        true_positives,
        false_positives,
        false_negatives,
        precision,
        recall,
        f1_score,
        risk_accurate: report.risk == case.expected_risk,
    }
}

/// Precision, recall and F1. An empty denominator counts as perfect precision
/// or recall; F1 is zero when both are zero.
pub fn detection_scores(tp: usize, fp: usize, fn_: usize) -> (f64, f64, f64) {
    let ratio = |num: usize, den: usize| {
        if den == 0 {
            1.0
        } else {
            num as f64 / den as f64
        }
    };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

fn rule_detection(outcomes: &[CaseOutcome]) -> Vec<RuleDetection> {
    let mut stats: Vec<RuleDetection> = Vec::new();
    for outcome in outcomes {
        for rule_id in &outcome.expected_violations {
            let hit = outcome.detected_violations.contains(rule_id);
            let entry = match stats.iter().position(|s| &s.rule_id == rule_id) {
                Some(index) => &mut stats[index],
                None => {
                    stats.push(RuleDetection {
                        rule_id: rule_id.clone(),
                        expected: 0,
                        detected: 0,
                        detection_rate: 0.0,
                    });
                    let last = stats.len() - 1;
                    &mut stats[last]
                }
            };
            entry.expected += 1;
            if hit {
                entry.detected += 1;
            }
        }
    }
    for entry in &mut stats {
        entry.detection_rate = entry.detected as f64 / entry.expected as f64;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analyzer::AnalysisSettings, llm::NoopLlmClient, scanner::rule_set::RuleSet};
    use std::sync::Arc;

    fn analyzer() -> ComplianceAnalyzer {
        let rules = RuleSet::from_pairs([
            ("data_breach", "data breach"),
            ("consent_violation", "without (explicit )?consent"),
            ("retention_policy", "retained forever"),
        ])
        .unwrap();
        ComplianceAnalyzer::new(rules, Arc::new(NoopLlmClient), AnalysisSettings::default())
    }

    fn case(id: u32, content: &str, expected: &[&str], risk: RiskLevel) -> EvaluationCase {
        EvaluationCase {
            id,
            name: format!("case {id}"),
            content: content.into(),
            expected_violations: expected.iter().map(|s| s.to_string()).collect(),
            expected_risk: risk,
        }
    }

    #[test]
    fn empty_denominators_follow_conventions() {
        assert_eq!(detection_scores(0, 0, 0), (1.0, 1.0, 1.0));
        assert_eq!(detection_scores(0, 2, 0), (0.0, 1.0, 0.0));
        let (p, r, f1) = detection_scores(0, 1, 1);
        assert_eq!((p, r, f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn partial_detection_scores() {
        let (p, r, f1) = detection_scores(1, 1, 0);
        assert_eq!(p, 0.5);
        assert_eq!(r, 1.0);
        assert!((f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn perfect_case_scores_one() {
        let summary = evaluate(
            &analyzer(),
            &[case(
                1,
                "A data breach happened. Another data breach followed.",
                &["data_breach"],
                RiskLevel::High,
            )],
        );
        let outcome = &summary.cases[0];
        assert_eq!(outcome.detected_violations, vec!["data_breach"]);
        assert_eq!(outcome.detected_risk, RiskLevel::High);
        assert!(outcome.risk_accurate);
        assert_eq!(summary.average_f1, 1.0);
        assert_eq!(summary.risk_accuracy, 1.0);
    }

    #[test]
    fn misses_and_extras_are_counted() {
        let summary = evaluate(
            &analyzer(),
            &[
                case(
                    1,
                    "Records are retained forever.",
                    &["retention_policy", "data_breach"],
                    RiskLevel::Low,
                ),
                case(
                    2,
                    "Collected without explicit consent.",
                    &[],
                    RiskLevel::Medium,
                ),
            ],
        );

        let first = &summary.cases[0];
        assert_eq!(first.true_positives, 1);
        assert_eq!(first.false_negatives, 1);
        assert_eq!(first.recall, 0.5);
        assert!(first.risk_accurate);

        let second = &summary.cases[1];
        assert_eq!(second.false_positives, 1);
        assert_eq!(second.precision, 0.0);
        assert_eq!(second.detected_risk, RiskLevel::Low);
        assert!(!second.risk_accurate);

        assert_eq!(summary.risk_accuracy, 0.5);
        assert_eq!(
            summary.rule_detection,
            vec![
                RuleDetection {
                    rule_id: "retention_policy".into(),
                    expected: 1,
                    detected: 1,
                    detection_rate: 1.0,
                },
                RuleDetection {
                    rule_id: "data_breach".into(),
                    expected: 1,
                    detected: 0,
                    detection_rate: 0.0,
                },
            ]
        );
    }

    #[test]
    fn no_cases_yield_zero_averages() {
        let summary = evaluate(&analyzer(), &[]);
        assert!(summary.cases.is_empty());
        assert_eq!(summary.average_precision, 0.0);
    }

    #[test]
    fn loads_cases_with_capitalised_risk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("cases.json");
        fs::write(
            &path,
            r#"[{"id": 1, "name": "breach", "content": "data breach", "expected_violations": ["data_breach"], "expected_risk": "High"}]"#,
        )
        .unwrap();
        let cases = load_cases(&path).unwrap();
        assert_eq!(cases[0].expected_risk, RiskLevel::High);
    }

    #[test]
    fn missing_case_file_names_path() {
        let err = load_cases("/does/not/exist/cases.json").unwrap_err();
        assert!(err.to_string().contains("/does/not/exist/cases.json"));
    }
}
