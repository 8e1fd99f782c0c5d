//! Gemini `generateContent` adapter for the [`ModelProvider`] port.
//!
//! Authentication uses the `x-goog-api-key` header rather than a URL
//! query parameter so the key never appears in logs, proxies, or error
//! messages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::domain::models::TokenUsage;
use crate::domain::ports::{
    FunctionCall, GenerateRequest, ModelProvider, ProviderError, ProviderResponse,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini rejects `$schema` and `additionalProperties` in function
/// parameter schemas; strip them recursively before sending.
fn strip_unsupported_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("additionalProperties");
            for v in map.values_mut() {
                strip_unsupported_fields(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                strip_unsupported_fields(v);
            }
        }
        _ => {}
    }
}

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiProvider {
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
        let mut contents: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": m.role.as_str(),
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        if !request.images.is_empty() {
            // Inline images attach to the last user turn.
            let parts: Vec<Value> = request
                .images
                .iter()
                .map(|img| {
                    json!({
                        "inline_data": {
                            "mime_type": img.mime_type,
                            "data": img.data
                        }
                    })
                })
                .collect();
            if let Some(last) = contents
                .iter_mut()
                .rev()
                .find(|c| c["role"] == "user")
                .and_then(|c| c["parts"].as_array_mut())
            {
                last.extend(parts);
            }
        }

        let mut body = json!({ "contents": contents });

        if let Some(system) = &request.system {
            body["system_instruction"] = json!({ "parts": [{ "text": system }] });
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|spec| {
                    let mut parameters = spec.parameters.clone();
                    strip_unsupported_fields(&mut parameters);
                    json!({
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": parameters
                    })
                })
                .collect();
            body["tools"] = json!([{ "function_declarations": declarations }]);
        }

        body
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
        let usage = data.get("usageMetadata").map_or_else(TokenUsage::default, |u| {
            TokenUsage::new(
                u.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0),
                u.get("candidatesTokenCount").and_then(Value::as_u64).unwrap_or(0),
            )
        });

        let mut text = String::new();
        let mut function_call = None;

        let empty = Vec::new();
        let parts = data["candidates"]
            .get(0)
            .and_then(|c| c["content"]["parts"].as_array())
            .unwrap_or(&empty);
        for part in parts {
            if let Some(t) = part.get("text").and_then(Value::as_str) {
                text.push_str(t);
            }
            if function_call.is_none() {
                if let Some(fc) = part.get("functionCall") {
                    function_call = Some(FunctionCall {
                        name: fc["name"].as_str().unwrap_or_default().to_string(),
                        arguments: fc.get("args").cloned().unwrap_or(Value::Object(Map::new())),
                    });
                }
            }
        }

        if text.is_empty() && function_call.is_none() {
            warn!("gemini returned a response with no text or function call");
        }

        ProviderResponse {
            text,
            function_call,
            usage,
            raw: data.clone(),
        }
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = Self::build_body(request);

        debug!(model = %request.model, messages = request.messages.len(), "calling gemini");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(model = %request.model, status = status.as_u16(), "gemini API error");
            return Err(Self::classify_status(status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)?;
        let parsed = Self::parse_response(&data);
        info!(
            model = %request.model,
            prompt_tokens = parsed.usage.prompt_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            "gemini call succeeded"
        );
        Ok(parsed)
    }
}
