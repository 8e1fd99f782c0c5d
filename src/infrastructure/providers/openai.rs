//! OpenAI-compatible chat-completions adapter, used as the secondary
//! (non-tiered) provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::domain::models::TokenUsage;
use crate::domain::ports::{
    GenerateRequest, ModelProvider, ProviderError, ProviderResponse, Role,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Override the API endpoint (used by tests against a mock server).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn build_body(request: &GenerateRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for m in &request.messages {
            let role = match m.role {
                Role::User => "user",
                Role::Model => "assistant",
            };
            messages.push(json!({ "role": role, "content": m.content }));
        }
        json!({ "model": request.model, "messages": messages })
    }

    fn classify_status(status: u16, body: &str) -> ProviderError {
        let summary: String = body.chars().take(200).collect();
        match status {
            429 => ProviderError::QuotaExceeded(summary),
            500..=599 => ProviderError::ServiceUnavailable(summary),
            400 => ProviderError::InvalidRequest(summary),
            401 | 403 => ProviderError::AuthFailed,
            _ => ProviderError::Unexpected(format!("HTTP {status}: {summary}")),
        }
    }

    fn parse_response(data: &Value) -> ProviderResponse {
        let text = data["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .unwrap_or_default()
            .to_string();
        let usage = data.get("usage").map_or_else(TokenUsage::default, |u| {
            TokenUsage::new(
                u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0),
                u.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0),
            )
        });
        ProviderResponse {
            text,
            function_call: None,
            usage,
            raw: data.clone(),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(request);

        debug!(model = %request.model, "calling openai-compatible endpoint");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(model = %request.model, status = status.as_u16(), "openai API error");
            return Err(Self::classify_status(status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)?;
        let parsed = Self::parse_response(&data);
        info!(
            model = %request.model,
            prompt_tokens = parsed.usage.prompt_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            "openai call succeeded"
        );
        Ok(parsed)
    }
}
