use serde::{Deserialize, Serialize};

use crate::risk::{RiskLevel, ScoreBreakdown};

pub mod context;
pub mod rule_scanner;
pub mod rule_set;
pub mod rule_source;

/// Byte span within the scanned text `(start, end)` where `start <= end`.
pub type Span = (usize, usize);

/// A named detection pattern as written in a rule source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Opaque label, unique within a rule set (e.g. `data_breach`).
    pub id: String,
    /// Regular expression source, matched case-insensitively.
    pub pattern: String,
}

impl Rule {
    pub fn new(id: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
        }
    }
}

/// Advisory annotation attached to a finding by the adjudicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Judgment {
    /// Free-text answer returned by the judgment capability.
    Verdict { text: String },
    /// The judgment call failed; the finding itself still stands.
    Failed { error: String },
}

impl Judgment {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Text suitable for display, whichever variant this is.
    pub fn display_text(&self) -> String {
        match self {
            Self::Verdict { text } => text.clone(),
            Self::Failed { error } => format!("judgment unavailable: {error}"),
        }
    }
}

/// One match occurrence of a rule in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub matched_text: String,
    pub span: Span,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judgment: Option<Judgment>,
}

impl Finding {
    /// Return a copy of this finding annotated with `judgment`.
    pub fn with_judgment(self, judgment: Judgment) -> Self {
        Self {
            judgment: Some(judgment),
            ..self
        }
    }
}

/// Findings plus the risk verdict derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    pub risk: RiskLevel,
    pub breakdown: ScoreBreakdown,
}
