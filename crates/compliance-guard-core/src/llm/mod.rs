mod anthropic;
mod http;
mod openai;
mod settings;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
pub use settings::{LlmSettings, ProviderKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A provider-neutral chat completion request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    /// A single user turn with no system preamble.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![ChatMessage::user(text)],
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Client abstraction for the language model behind judgments and summaries.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a chat completion and return the assistant's text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Stateless single-prompt judgment.
    async fn judge(&self, prompt: &str) -> Result<String> {
        self.complete(&CompletionRequest::prompt(prompt)).await
    }
}

/// Offline client used when no provider is configured.
#[derive(Debug, Default, Clone)]
pub struct NoopLlmClient;

pub const NOOP_RESPONSE: &str =
    "LLM provider not configured (noop); no generated text is available.";

#[async_trait]
impl LlmClient for NoopLlmClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Ok(NOOP_RESPONSE.to_string())
    }
}

/// Build the client selected by `settings`.
pub fn build_client(settings: &LlmSettings) -> Result<Arc<dyn LlmClient>> {
    let kind = settings.validate()?;
    let client: Arc<dyn LlmClient> = match kind {
        ProviderKind::Noop => Arc::new(NoopLlmClient),
        ProviderKind::Groq | ProviderKind::OpenAi => Arc::new(OpenAiClient::new(kind, settings)?),
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(settings)?),
    };
    tracing::debug!(provider = kind.label(), "initialised LLM client");
    Ok(client)
}
