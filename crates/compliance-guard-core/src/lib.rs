pub mod adjudicator;
pub mod analyzer;
pub mod document;
pub mod error;
pub mod evaluation;
pub mod llm;
pub mod report;
pub mod retrieval;
pub mod risk;
pub mod scanner;

pub use adjudicator::Adjudicator;
pub use analyzer::{AnalysisResult, AnalysisSettings, ComplianceAnalyzer, DEFAULT_QUERY};
pub use document::{DocumentFormat, DocumentLoader, FileDocumentLoader};
pub use error::{AdjudicationError, AnalysisError, DocumentLoadError, RuleSetError};
pub use llm::{build_client, LlmClient, LlmSettings, ProviderKind};
pub use retrieval::{DocumentSession, QaSession, RetrievalConfig};
pub use risk::{RiskAggregator, RiskLevel, RiskThresholds};
pub use scanner::{
    rule_scanner::RuleScanner, rule_set::RuleSet, rule_source::RuleFormat, Finding, Judgment,
    Rule, ScanReport, Span,
};
