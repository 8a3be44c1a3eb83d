use std::{error::Error as StdError, path::PathBuf};

use thiserror::Error;

use crate::scanner::ScanReport;

/// Boxed cause carried by errors that wrap a collaborator failure.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while loading or compiling a rule set. Always fatal.
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("failed to read rule source at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported rule source format `{extension}` (expected json, json5, yaml, yml or txt)")]
    UnsupportedFormat { extension: String },
    #[error("rule source is not a mapping of rule id to pattern: {message}")]
    Parse { message: String },
    #[error("invalid rule line {line} (expected `id | pattern`)")]
    InvalidLine { line: usize },
    #[error("duplicate rule id `{rule_id}`")]
    DuplicateId { rule_id: String },
    #[error("rule `{rule_id}` has an invalid pattern")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised while turning an input document into plain text.
#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("unsupported document format `{format}` (expected txt, md, pdf or docx)")]
    UnsupportedFormat { format: String },
    #[error("failed to read document at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("plain-text document is not valid UTF-8")]
    InvalidEncoding(#[source] std::string::FromUtf8Error),
    #[error("failed to extract text from PDF: {0}")]
    Pdf(String),
    #[error("failed to extract text from DOCX: {0}")]
    Docx(String),
}

/// A single adjudication call that did not produce a judgment.
#[derive(Debug, Error)]
#[error("adjudication failed for rule `{rule_id}`")]
pub struct AdjudicationError {
    pub rule_id: String,
    #[source]
    pub source: BoxError,
}

/// Fatal failures of a full document analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    DocumentLoad(#[from] DocumentLoadError),
    /// Summary generation failed after the scan and risk assessment completed.
    #[error("summary generation failed")]
    Summary {
        #[source]
        source: BoxError,
        partial: Box<ScanReport>,
    },
}

impl AnalysisError {
    /// Findings and risk computed before the failure, when the scan got that far.
    pub fn partial_report(&self) -> Option<&ScanReport> {
        match self {
            Self::Summary { partial, .. } => Some(partial),
            Self::DocumentLoad(_) => None,
        }
    }
}
