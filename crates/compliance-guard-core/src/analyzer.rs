use std::{path::Path, sync::Arc};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    adjudicator::Adjudicator,
    document::{DocumentLoader, FileDocumentLoader},
    error::AnalysisError,
    llm::LlmClient,
    retrieval::{DocumentSession, QaSession, RetrievalConfig},
    risk::{RiskAggregator, RiskThresholds},
    scanner::{
        context::DEFAULT_CONTEXT_WINDOW, rule_scanner::RuleScanner, rule_set::RuleSet, Finding,
        ScanReport,
    },
};

/// Question asked of the document when the caller does not supply one.
pub const DEFAULT_QUERY: &str = "Summarize all compliance risks in the document.";

/// Tunables for a [`ComplianceAnalyzer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Characters of context kept on each side of a match.
    pub context_window: usize,
    /// Ask the language model to judge each finding.
    pub adjudicate: bool,
    pub medium_threshold: u32,
    pub high_threshold: u32,
    pub retrieval: RetrievalConfig,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let thresholds = RiskThresholds::default();
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            adjudicate: true,
            medium_threshold: thresholds.medium,
            high_threshold: thresholds.high,
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AnalysisSettings {
    pub fn thresholds(&self) -> RiskThresholds {
        RiskThresholds {
            medium: self.medium_threshold,
            high: self.high_threshold,
        }
    }

    /// Reject thresholds that would rate a finding-free document above Low
    /// or rank Medium above High.
    pub fn validate(&self) -> Result<()> {
        if self.medium_threshold == 0 {
            bail!("analysis.medium_threshold must be at least 1");
        }
        if self.medium_threshold > self.high_threshold {
            bail!(
                "analysis.medium_threshold ({}) must not exceed analysis.high_threshold ({})",
                self.medium_threshold,
                self.high_threshold
            );
        }
        Ok(())
    }
}

/// Scan report plus the narrative summary produced for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub report: ScanReport,
    pub summary: String,
}

/// Runs the full pipeline for one document at a time: load, scan,
/// adjudicate, assess, summarize.
///
/// The analyzer itself holds only read-only state and can be shared; every
/// analysis gets its own retrieval session.
#[derive(Clone)]
pub struct ComplianceAnalyzer {
    rules: Arc<RuleSet>,
    client: Arc<dyn LlmClient>,
    loader: Arc<dyn DocumentLoader>,
    scanner: RuleScanner,
    aggregator: RiskAggregator,
    adjudicator: Adjudicator,
    settings: AnalysisSettings,
}

impl ComplianceAnalyzer {
    pub fn new(rules: RuleSet, client: Arc<dyn LlmClient>, settings: AnalysisSettings) -> Self {
        Self {
            rules: Arc::new(rules),
            adjudicator: Adjudicator::new(Arc::clone(&client)),
            client,
            loader: Arc::new(FileDocumentLoader),
            scanner: RuleScanner::with_context_window(settings.context_window),
            aggregator: RiskAggregator::with_thresholds(settings.thresholds()),
            settings,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Offline scan and risk assessment; no model calls.
    pub fn scan(&self, text: &str) -> ScanReport {
        let findings = self.scanner.scan(&self.rules, text);
        self.report_for(findings)
    }

    /// Scan, then adjudicate the findings when enabled, then assess.
    pub async fn assess(&self, text: &str) -> ScanReport {
        let mut findings = self.scanner.scan(&self.rules, text);
        if self.settings.adjudicate && !findings.is_empty() {
            findings = self.adjudicator.adjudicate(findings).await;
        }
        self.report_for(findings)
    }

    /// Load `path` and analyze its text. Load failures abort before scanning.
    #[instrument(name = "analyze_document", skip(self, path, query), fields(path = %path.display()))]
    pub async fn analyze_file(
        &self,
        path: &Path,
        query: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let text = self.loader.load(path)?;
        self.analyze_text(&text, query).await
    }

    /// Analyze already-extracted text with a fresh retrieval session.
    pub async fn analyze_text(
        &self,
        text: &str,
        query: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut session = DocumentSession::new(
            Arc::clone(&self.client),
            text,
            self.settings.retrieval.clone(),
        );
        self.analyze_with_session(text, query, &mut session).await
    }

    /// Analyze `text`, asking `session` for the summary.
    pub async fn analyze_with_session(
        &self,
        text: &str,
        query: Option<&str>,
        session: &mut dyn QaSession,
    ) -> Result<AnalysisResult, AnalysisError> {
        let report = self.assess(text).await;
        info!(
            findings = report.findings.len(),
            risk = %report.risk,
            score = report.breakdown.score,
            "risk assessed"
        );

        let query = query.unwrap_or(DEFAULT_QUERY);
        match session.answer(query).await {
            Ok(summary) => {
                debug!(summary_chars = summary.chars().count(), "summary generated");
                Ok(AnalysisResult { report, summary })
            }
            Err(err) => Err(AnalysisError::Summary {
                source: err.into(),
                partial: Box::new(report),
            }),
        }
    }

    fn report_for(&self, findings: Vec<Finding>) -> ScanReport {
        let breakdown = self.aggregator.breakdown(&findings);
        ScanReport {
            risk: self.aggregator.level_for(breakdown.score),
            findings,
            breakdown,
        }
    }
}
