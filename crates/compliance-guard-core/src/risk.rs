use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scanner::Finding;

/// Overall risk verdict for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[serde(alias = "Low")]
    Low,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "High")]
    High,
}

impl RiskLevel {
    /// Map an accumulated score using the default thresholds.
    pub fn from_score(score: u32) -> Self {
        Self::from_score_with_thresholds(score, &RiskThresholds::default())
    }

    pub fn from_score_with_thresholds(score: u32, thresholds: &RiskThresholds) -> Self {
        if score >= thresholds.high {
            Self::High
        } else if score >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

/// Minimum scores for the Medium and High levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: u32,
    pub high: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { medium: 3, high: 6 }
    }
}

/// Weight class a finding falls into, derived from its rule id.
///
/// Severity is read from the rule's *name*, not from what it matched, so
/// renaming a rule changes its weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBucket {
    /// Ids mentioning `breach` or `encryption`.
    Critical,
    /// Ids mentioning `consent` or `data sharing`.
    Elevated,
    Baseline,
}

impl SeverityBucket {
    pub fn classify(rule_id: &str) -> Self {
        let label = rule_id.to_lowercase();
        if label.contains("breach") || label.contains("encryption") {
            Self::Critical
        } else if label.contains("consent") || label.contains("data sharing") {
            Self::Elevated
        } else {
            Self::Baseline
        }
    }

    pub fn weight(self) -> u32 {
        match self {
            Self::Critical => 3,
            Self::Elevated => 2,
            Self::Baseline => 1,
        }
    }
}

/// Points contributed by one severity bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketContribution {
    pub bucket: SeverityBucket,
    pub occurrences: usize,
    pub points: u32,
}

/// Score plus the per-bucket detail it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScoreBreakdown {
    pub score: u32,
    pub contributions: Vec<BucketContribution>,
}

/// Turns findings into a [`RiskLevel`] by weighted counting.
#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    thresholds: RiskThresholds,
}

impl RiskAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn assess(&self, findings: &[Finding]) -> RiskLevel {
        self.level_for(score_findings(findings))
    }

    pub fn level_for(&self, score: u32) -> RiskLevel {
        RiskLevel::from_score_with_thresholds(score, &self.thresholds)
    }

    /// Score broken down by severity bucket, highest bucket first. Buckets
    /// without findings are omitted.
    pub fn breakdown(&self, findings: &[Finding]) -> ScoreBreakdown {
        let mut contributions: Vec<BucketContribution> = Vec::new();
        for finding in findings {
            let bucket = SeverityBucket::classify(&finding.rule_id);
            match contributions.iter_mut().find(|c| c.bucket == bucket) {
                Some(entry) => {
                    entry.occurrences += 1;
                    entry.points += bucket.weight();
                }
                None => contributions.push(BucketContribution {
                    bucket,
                    occurrences: 1,
                    points: bucket.weight(),
                }),
            }
        }
        contributions.sort_by_key(|c| c.bucket);
        ScoreBreakdown {
            score: contributions.iter().map(|c| c.points).sum(),
            contributions,
        }
    }
}

/// Sum of per-finding weights.
pub fn score_findings(findings: &[Finding]) -> u32 {
    findings
        .iter()
        .map(|finding| SeverityBucket::classify(&finding.rule_id).weight())
        .sum()
}
