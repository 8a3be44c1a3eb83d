use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use compliance_guard_core::{AnalysisSettings, LlmSettings};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "COMPLIANCE_GUARD";
pub const DEFAULT_RULES_PATH: &str = "./rules/rules.json";

/// Settings assembled from an optional config file and the environment.
///
/// Environment variables use `__` between nesting levels, e.g.
/// `COMPLIANCE_GUARD_LLM__API_KEY` or `COMPLIANCE_GUARD_ANALYSIS__ADJUDICATE`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rules: Option<PathBuf>,
    pub llm: LlmSettings,
    pub analysis: AnalysisSettings,
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().with_context(|| match config_path {
            Some(path) => format!("failed to load configuration from {}", path.display()),
            None => "failed to load configuration from the environment".to_string(),
        })?;
        let config: Self = settings
            .try_deserialize()
            .context("invalid configuration values")?;
        config
            .analysis
            .validate()
            .context("invalid risk thresholds")?;
        Ok(config)
    }

    pub fn rules_path(&self) -> PathBuf {
        self.rules
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_PATH))
    }
}
