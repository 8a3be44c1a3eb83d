use super::{
    http::{build_http_client, send_with_retry},
    CompletionRequest, LlmClient, LlmSettings, ProviderKind,
};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Client for OpenAI-style chat completion APIs (OpenAI itself and Groq).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_retries: u32,
    label: &'static str,
}

impl OpenAiClient {
    pub fn new(kind: ProviderKind, settings: &LlmSettings) -> Result<Self> {
        if !matches!(kind, ProviderKind::OpenAi | ProviderKind::Groq) {
            bail!("provider `{}` is not OpenAI-compatible", kind.label());
        }
        if settings.api_key.trim().is_empty() {
            bail!("{} API key must be provided via llm.api_key", kind.label());
        }
        let url = format!("{}/v1/chat/completions", settings.endpoint_or_default(kind));
        Ok(Self {
            http: build_http_client(kind.label(), settings.timeout())?,
            url,
            api_key: settings.api_key.clone(),
            model: settings.model_or_default(kind),
            temperature: settings.temperature,
            max_retries: settings.max_retries,
            label: kind.label(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system.as_deref() {
            messages.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        messages.extend(request.messages.iter().map(|message| WireMessage {
            role: message.role.as_str(),
            content: &message.content,
        }));
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let response = send_with_retry(self.label, self.max_retries, || {
            self.http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&payload)
        })
        .await?;

        let chat: ChatCompletionResponse = response
            .json()
            .await
            .with_context(|| format!("failed to parse {} response", self.label))?;
        chat.choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow!("{} response missing message content", self.label))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
