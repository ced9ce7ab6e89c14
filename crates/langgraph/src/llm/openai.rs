//! OpenAI-compatible LLM client (Chat Completions API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::LlmClient;
use super::error::LlmError;
use super::types::{ChatRequest, ChatResponse, Usage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Base URL, default `https://api.openai.com/v1`; any compatible endpoint works.
    pub base_url: String,
    /// Model id, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Temperature used when the request does not set one.
    pub default_temperature: Option<f32>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            default_temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiRequestBody<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageOut,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessageOut {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

/// Chat Completions client over `reqwest`.
///
/// **Interaction**: Implements `LlmClient`; built from `OpenAiConfig` by the
/// application and shared as `Arc<dyn LlmClient>`.
#[derive(Debug)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_body<'a>(&'a self, req: &'a ChatRequest) -> OpenAiRequestBody<'a> {
        OpenAiRequestBody {
            model: &self.config.model,
            messages: req
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: req.temperature.or(self.config.default_temperature),
            max_tokens: req.max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = self.config.completions_url();
        let body = self.build_body(&req);
        debug!(model = %self.config.model, messages = body.messages.len(), "chat completion request");
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        let status = res.status();
        let text = res.text().await.map_err(|e| LlmError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), text));
        }
        parse_response(&text)
    }
}

fn parse_response(text: &str) -> Result<ChatResponse, LlmError> {
    let parsed: OpenAiResponse =
        serde_json::from_str(text).map_err(|e| LlmError::Parsing(format!("{e}: {text}")))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    let usage = parsed
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();
    Ok(ChatResponse { content, usage })
}
