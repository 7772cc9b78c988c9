//! LLM gateway: tiered `chat(tier, temperature, messages,
//! schema) -> parsed value`, with deterministic JSON decoding against the
//! caller's schema and the same retry/timeout discipline as embeddings.
//!
//! Tier selection itself (which chain uses `high` vs `lite`) is a pure
//! lookup owned by `articlesmith-chains`; this gateway only resolves a tier
//! to a model identifier and makes the call.

use std::time::Duration;

use articlesmith_core::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::retry::{retry_transient, Attempt};

/// The two model tiers chains are routed across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    High,
    Lite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Uniform chat surface over the two-tier LLM. The returned value is decoded
/// JSON that the caller is responsible for validating against its own typed
/// schema (schema validation failure is an `ErrSchema`, never retried).
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn chat(
        &self,
        tier: ModelTier,
        temperature: f64,
        messages: &[ChatMessage],
    ) -> Result<Value>;
}

/// HTTP-backed chat gateway. `high_model`/`lite_model` are the concrete
/// model identifiers the tiers resolve to; kept as configuration rather
/// than hardcoded, since only the tier's behavior contract is fixed, not
/// the model backing it.
pub struct HttpLlmGateway {
    base_url: String,
    api_key: Option<String>,
    high_model: String,
    lite_model: String,
    call_timeout: Duration,
    max_attempts: u32,
}

impl HttpLlmGateway {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        high_model: impl Into<String>,
        lite_model: impl Into<String>,
        call_timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            high_model: high_model.into(),
            lite_model: lite_model.into(),
            call_timeout,
            max_attempts,
        }
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::High => &self.high_model,
            ModelTier::Lite => &self.lite_model,
        }
    }

    async fn call_once(
        &self,
        model: &str,
        temperature: f64,
        messages: &[ChatMessage],
    ) -> Attempt<Value, Error> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = serde_json::json!({
            "model": model,
            "temperature": temperature,
            "response_format": { "type": "json_object" },
            "messages": messages,
        });
        let body = match serde_json::to_vec(&payload) {
            Ok(b) => b,
            Err(e) => return Attempt::Permanent(Error::Schema(e.to_string())),
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("Authorization".to_string(), format!("Bearer {key}")));
        }

        let client = asupersync::http::h1::HttpClient::new();
        let request = client.request(asupersync::http::h1::Method::Post, &url, headers, body);
        let response = match tokio::time::timeout(self.call_timeout, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Attempt::Transient(Error::Upstream(e.to_string())),
            Err(_) => return Attempt::Transient(Error::Timeout("chat call".to_string())),
        };

        if response.status >= 500 || response.status == 429 {
            return Attempt::Transient(Error::Upstream(format!(
                "llm gateway returned {}",
                response.status
            )));
        }
        if response.status != 200 {
            let body_text = String::from_utf8_lossy(&response.body).to_string();
            return Attempt::Permanent(Error::Upstream(format!(
                "llm gateway returned {}: {body_text}",
                response.status
            )));
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }
        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        let parsed: ChatResponse = match serde_json::from_slice(&response.body) {
            Ok(p) => p,
            Err(e) => return Attempt::Permanent(Error::Schema(format!("chat envelope: {e}"))),
        };

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Attempt::Permanent(Error::Schema("chat response had no choices".to_string()));
        };

        match extract_json(&choice.message.content) {
            Some(value) => Attempt::Ok(value),
            None => Attempt::Permanent(Error::Schema(
                "model output was not parseable JSON".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LlmGateway for HttpLlmGateway {
    async fn chat(
        &self,
        tier: ModelTier,
        temperature: f64,
        messages: &[ChatMessage],
    ) -> Result<Value> {
        let model = self.model_for(tier).to_string();
        retry_transient(self.max_attempts, Duration::from_millis(250), || {
            self.call_once(&model, temperature, messages)
        })
        .await
    }
}

/// Extract JSON from a model completion via three fallback strategies:
/// direct parse, fenced code block, outermost-brace slice.
#[must_use]
fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(fenced) = extract_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(&fenced) {
            return Some(value);
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn extract_fenced_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let after_fence = after_fence.strip_prefix("json").unwrap_or(after_fence);
    let after_fence = after_fence.strip_prefix('\n').unwrap_or(after_fence);
    let end = after_fence.find("```")?;
    Some(after_fence[..end].trim().to_string())
}
