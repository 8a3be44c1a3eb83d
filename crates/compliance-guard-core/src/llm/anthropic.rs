use super::{
    http::{build_http_client, send_with_retry},
    CompletionRequest, LlmClient, LlmSettings, ProviderKind,
};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_API_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: Client,
    url: String,
    api_key: String,
    api_version: String,
    model: String,
    temperature: Option<f32>,
    max_retries: u32,
}

impl AnthropicClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            bail!("Anthropic API key must be provided via llm.api_key");
        }
        let kind = ProviderKind::Anthropic;
        let url = format!("{}/v1/messages", settings.endpoint_or_default(kind));
        Ok(Self {
            http: build_http_client(kind.label(), settings.timeout())?,
            url,
            api_key: settings.api_key.clone(),
            api_version: settings
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            model: settings.model_or_default(kind),
            temperature: settings.temperature,
            max_retries: settings.max_retries,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let payload = AnthropicRequest {
            model: &self.model,
            system: request.system.as_deref(),
            messages: request
                .messages
                .iter()
                .map(|message| AnthropicMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: self.temperature,
        };

        let response = send_with_retry("anthropic", self.max_retries, || {
            self.http
                .post(&self.url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", &self.api_version)
                .json(&payload)
        })
        .await?;

        let message: AnthropicResponse = response
            .json()
            .await
            .context("failed to parse Anthropic response")?;
        let text = message
            .content
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("\n");
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("Anthropic response missing message content"));
        }
        Ok(text.to_string())
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}
