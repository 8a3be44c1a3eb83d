use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::{
    error::AdjudicationError,
    llm::LlmClient,
    scanner::{Finding, Judgment},
};

/// Asks a judgment capability whether each finding is a genuine violation.
///
/// Judgments are advisory: findings are never dropped or altered beyond the
/// attached judgment, and a failed call only marks that finding.
#[derive(Clone)]
pub struct Adjudicator {
    client: Arc<dyn LlmClient>,
}

impl Adjudicator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn prompt_for(finding: &Finding) -> String {
        format!(
            "In the following policy text, does this indicate a violation of '{}'?\n\n\"{}\"",
            finding.rule_id, finding.context
        )
    }

    /// Judge a single finding.
    pub async fn judge(&self, finding: &Finding) -> Result<String, AdjudicationError> {
        self.client
            .judge(&Self::prompt_for(finding))
            .await
            .map_err(|err| AdjudicationError {
                rule_id: finding.rule_id.clone(),
                source: err.into(),
            })
    }

    /// Annotate every finding in order, recording failures in place.
    #[instrument(name = "adjudicate_findings", skip(self, findings), fields(findings = findings.len()))]
    pub async fn adjudicate(&self, findings: Vec<Finding>) -> Vec<Finding> {
        let mut judged = Vec::with_capacity(findings.len());
        let mut failures = 0usize;
        for finding in findings {
            let judgment = match self.judge(&finding).await {
                Ok(text) => Judgment::Verdict { text },
                Err(err) => {
                    failures += 1;
                    let error = format!("{:#}", anyhow::Error::from(err));
                    warn!(rule_id = %finding.rule_id, %error, "adjudication failed; keeping finding");
                    Judgment::Failed { error }
                }
            };
            judged.push(finding.with_judgment(judgment));
        }
        debug!(failures, "adjudication completed");
        judged
    }
}
