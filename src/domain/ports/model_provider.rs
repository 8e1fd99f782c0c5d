//! Port trait for LLM providers.
//!
//! This is a **port** in hexagonal architecture terms: the gateway and
//! engine depend on this trait, never on a concrete HTTP client.
//! Adapters in the infrastructure layer implement it for specific APIs
//! (Gemini `generateContent`, OpenAI-compatible chat completions) and are
//! responsible for timeouts and wire-level concerns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::models::TokenUsage;

/// Errors a provider call can surface.
///
/// Only [`ProviderError::QuotaExceeded`] and
/// [`ProviderError::ServiceUnavailable`] trigger fallback-chain
/// advancement; everything else is request-fatal.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Quota or rate limit exhausted on the provider side (HTTP 429).
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Provider temporarily unavailable (HTTP 5xx).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Malformed request rejected by the provider (HTTP 400).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing API key (HTTP 401/403).
    #[error("authentication failed")]
    AuthFailed,

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything the provider returned that we could not classify.
    #[error("unexpected provider error: {0}")]
    Unexpected(String),
}

impl ProviderError {
    /// True if this error should advance the fallback chain instead of
    /// aborting the request.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_) | Self::ServiceUnavailable(_))
    }
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// A single turn in the conversation sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
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

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// Inline image payload attached to a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Declaration of a callable tool, passed to providers that support
/// native function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's parameters.
    pub parameters: Value,
}

/// A single logical generate request, provider-agnostic.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Concrete model id to invoke.
    pub model: String,
    /// Optional system prompt.
    pub system: Option<String>,
    /// Conversation history, oldest first. The last message is the one
    /// being answered.
    pub messages: Vec<ChatMessage>,
    /// Inline images, when the model accepts them.
    pub images: Vec<ImageData>,
    /// Tool declarations; empty disables native function calling.
    pub tools: Vec<ToolSpec>,
}

/// A native structured function call returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw arguments as the provider returned them; `null` is legal and
    /// normalizes to an empty map at parse time.
    pub arguments: Value,
}

/// Response from a single provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Concatenated text parts of the response.
    pub text: String,
    /// Native structured function call, when the model produced one.
    pub function_call: Option<FunctionCall>,
    /// Token accounting for this call.
    pub usage: TokenUsage,
    /// The raw provider payload, kept for diagnostics.
    pub raw: Value,
}

impl ProviderResponse {
    /// A plain-text response with no structured call (test helper and
    /// degenerate-path constructor).
    pub fn text_only(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            function_call: None,
            usage,
            raw: Value::Null,
        }
    }
}

/// Abstract LLM provider: a single `generate` entry point that may fail
/// with a classified [`ProviderError`].
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Short provider family name for logs and health reports
    /// (e.g. `"gemini"`, `"openai"`).
    fn name(&self) -> &str;

    /// Execute one generate call against the given model.
    async fn generate(&self, request: &GenerateRequest) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::QuotaExceeded("429".to_string()).is_transient());
        assert!(ProviderError::ServiceUnavailable("503".to_string()).is_transient());
        assert!(!ProviderError::InvalidRequest("bad".to_string()).is_transient());
        assert!(!ProviderError::AuthFailed.is_transient());
        assert!(!ProviderError::Unexpected("?".to_string()).is_transient());
    }

    #[test]
    fn test_chat_message_helpers() {
        assert_eq!(ChatMessage::user("hi").role, Role::User);
        assert_eq!(ChatMessage::model("hello").role, Role::Model);
        assert_eq!(Role::Model.as_str(), "model");
    }
}
