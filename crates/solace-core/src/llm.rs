//! OpenAI-compatible chat-completions client backing [`TextGenerator`].
//!
//! Defaults to OpenRouter. API key resolution: config `llm_api_key`, then
//! `SOLACE_LLM_API_KEY`, then `OPENROUTER_API_KEY`. Without a key every call fails with
//! [`CheckinError::Generation`], which the orchestrator turns into its fallbacks.

use crate::config::CheckinConfig;
use crate::error::{CheckinError, CheckinResult};
use crate::traits::{GenerationHint, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemma-3-27b-it";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Single-shot prompt -> text generator over `{base}/chat/completions`.
pub struct OpenAiCompatGenerator {
    api_base: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    pub fn new(api_base: &str, api_key: Option<String>, model: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
            model: model.to_string(),
            client,
        }
    }

    pub fn from_config(cfg: &CheckinConfig) -> Self {
        Self::new(
            &cfg.llm_api_url,
            cfg.llm_api_key.clone(),
            &cfg.llm_model,
            Duration::from_secs(cfg.llm_timeout_secs),
        )
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body<'a>(&'a self, prompt: &'a str, hint: GenerationHint) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: Some(0.7),
            response_format: match hint {
                GenerationHint::Json => Some(ResponseFormat { kind: "json_object" }),
                GenerationHint::Text => None,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    async fn generate(&self, prompt: &str, hint: GenerationHint) -> CheckinResult<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(CheckinError::Generation("no LLM API key configured".to_string()));
        };

        let url = format!("{}/chat/completions", self.api_base);
        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("HTTP-Referer", "https://solace.local")
            .header("X-Title", "Solace-Checkin")
            .json(&self.request_body(prompt, hint))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(target: "solace::llm", %status, model = %self.model, "generation request rejected");
            return Err(CheckinError::Generation(format!("API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = res.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CheckinError::Generation("empty completion".to_string()))?;

        tracing::debug!(target: "solace::llm", model = %self.model, chars = text.len(), ?hint, "generation complete");
        Ok(text)
    }
}
