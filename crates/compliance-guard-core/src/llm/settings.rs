use std::{fmt, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Groq's OpenAI-compatible endpoint.
    Groq,
    OpenAi,
    Anthropic,
    /// Offline provider returning canned text; needs no credentials.
    Noop,
}

impl ProviderKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Noop => "noop",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai",
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Noop => "",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Groq => "llama3-70b-8192",
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-haiku-20240307",
            Self::Noop => "noop",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "noop" => Ok(Self::Noop),
            other => Err(anyhow!(
                "unknown LLM provider `{other}` (expected groq, openai, anthropic or noop)"
            )),
        }
    }
}

/// Explicit configuration for the generation and judgment backends.
///
/// Callers assemble this (from a config file, environment, flags); the core
/// never looks credentials up on its own.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Millisecond timeout; takes precedence over `timeout_secs`.
    pub timeout_ms: Option<u64>,
    pub max_retries: u32,
    pub temperature: Option<f32>,
    pub api_version: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Groq.label().to_string(),
            api_key: String::new(),
            endpoint: None,
            model: None,
            timeout_secs: None,
            timeout_ms: None,
            max_retries: DEFAULT_MAX_RETRIES,
            temperature: None,
            api_version: None,
        }
    }
}

impl LlmSettings {
    /// Settings for the offline provider.
    pub fn noop() -> Self {
        Self {
            provider: ProviderKind::Noop.label().to_string(),
            ..Self::default()
        }
    }

    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.provider.parse()
    }

    /// Check the provider name and that a key is present where one is needed.
    pub fn validate(&self) -> Result<ProviderKind> {
        let kind = self.provider_kind()?;
        if kind != ProviderKind::Noop && self.api_key.trim().is_empty() {
            bail!(
                "an API key must be configured (llm.api_key) for provider `{}`",
                kind.label()
            );
        }
        Ok(kind)
    }

    pub fn endpoint_or_default(&self, kind: ProviderKind) -> String {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(kind.default_endpoint())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn model_or_default(&self, kind: ProviderKind) -> String {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(kind.default_model())
            .to_string()
    }

    pub fn timeout(&self) -> Duration {
        match self.timeout_ms {
            Some(millis) => Duration::from_millis(millis.max(1)),
            None => Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1)),
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("temperature", &self.temperature)
            .field("api_version", &self.api_version)
            .finish()
    }
}
