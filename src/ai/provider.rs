//! LLM provider seam and the OpenAI-compatible implementation.
//!
//! Works with OpenAI and any other service implementing the chat
//! completions API with `json_schema` response formats.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A system/user prompt pair with the JSON schema the answer must follow
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub schema_name: String,
    pub schema: Value,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Value,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ],
            "temperature": 0.2,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema
                }
            }
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("Sending completion request to {} (model {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(request))
            .send()
            .await
            .context("LLM request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, error_text);
        }

        let chat: ChatResponse = response.json().await.context("Invalid LLM response")?;
        let message = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .context("LLM returned no choices")?;

        if let Some(refusal) = message.refusal {
            anyhow::bail!("LLM refused: {}", refusal);
        }

        let text = message.content.context("LLM returned an empty message")?;
        let content: Value = serde_json::from_str(strip_code_fences(&text))
            .context("LLM did not return valid JSON")?;

        let usage = chat.usage.unwrap_or_default();
        log::info!(
            "LLM usage: {} prompt + {} completion = {} tokens",
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens
        );

        Ok(CompletionResponse { content, usage })
    }
}

/// Remove a surrounding markdown code fence, if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
