use tracing::{debug, instrument, trace};

use super::{
    context::{extract_context, DEFAULT_CONTEXT_WINDOW},
    rule_set::RuleSet,
    Finding,
};

/// Applies a rule set to document text.
///
/// Findings come out grouped by rule (rule-set order), and by position within
/// each rule. Patterns that match the empty string yield one finding per
/// position, except right after a non-empty match; rule authors are expected
/// to avoid them.
#[derive(Debug, Clone)]
pub struct RuleScanner {
    context_window: usize,
}

impl Default for RuleScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleScanner {
    pub fn new() -> Self {
        Self::with_context_window(DEFAULT_CONTEXT_WINDOW)
    }

    pub fn with_context_window(context_window: usize) -> Self {
        Self { context_window }
    }

    pub fn context_window(&self) -> usize {
        self.context_window
    }

    #[instrument(name = "scan_text", skip(self, rules, text), fields(input_len = text.len(), rules = rules.len()))]
    pub fn scan(&self, rules: &RuleSet, text: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in rules.iter() {
            trace!(rule_id = %rule.id(), "scanning rule");
            for mat in rule.regex().find_iter(text) {
                findings.push(Finding {
                    rule_id: rule.id().to_string(),
                    matched_text: mat.as_str().to_string(),
                    span: (mat.start(), mat.end()),
                    context: extract_context(text, mat.start(), mat.end(), self.context_window)
                        .to_string(),
                    judgment: None,
                });
            }
        }
        debug!(findings = findings.len(), "scan completed");
        findings
    }
}
