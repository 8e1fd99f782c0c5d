//! Tiered model gateway with per-model circuit breakers.
//!
//! Routes one logical "generate" request to a concrete model by walking
//! the tier's fallback chain. Transient provider errors (quota,
//! unavailability) advance the chain; anything else is request-fatal.
//! The gateway knows nothing about reasoning state.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::AgentError;
use crate::domain::models::{GatewayConfig, ModelTier, ModelsConfig};
use crate::domain::ports::{
    ChatMessage, GenerateRequest, ImageData, ModelProvider, ProviderError, ProviderResponse,
    ToolSpec,
};
use crate::services::circuit_breaker::{BreakerConfig, BreakerRegistry};
use crate::services::cost_tracker::QueryCostTracker;

/// Factory for the lazily-instantiated secondary provider.
pub type SecondaryFactory =
    Box<dyn Fn() -> Result<Arc<dyn ModelProvider>, ProviderError> + Send + Sync>;

/// A stateful chat handle: prior turns plus the model currently serving
/// the conversation.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    /// Model the session is pinned to (updated to whichever chain member
    /// actually served the last turn).
    pub model: String,
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
        }
    }
}

/// Successful gateway result: response text plus which model produced it.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    /// Text of the winning response.
    pub text: String,
    /// Concrete model that served the call.
    pub model_used: String,
    /// Full provider response (raw payload, usage, native function call).
    pub response: ProviderResponse,
}

/// Routes generate requests through tiered fallback chains.
pub struct ModelGateway {
    provider: Arc<dyn ModelProvider>,
    secondary: OnceCell<Arc<dyn ModelProvider>>,
    secondary_factory: Option<SecondaryFactory>,
    breakers: BreakerRegistry,
    models: ModelsConfig,
    config: GatewayConfig,
    tool_specs: Vec<ToolSpec>,
    system_prompt: Option<String>,
}

impl ModelGateway {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        models: ModelsConfig,
        config: GatewayConfig,
    ) -> Self {
        let breakers = BreakerRegistry::new(BreakerConfig {
            failure_threshold: config.failure_threshold,
            success_threshold: config.success_threshold,
            open_timeout: chrono::Duration::seconds(config.open_timeout_secs as i64),
        });
        Self {
            provider,
            secondary: OnceCell::new(),
            secondary_factory: None,
            breakers,
            models,
            config,
            tool_specs: Vec::new(),
            system_prompt: None,
        }
    }

    /// Install the factory used to lazily build the secondary provider.
    #[must_use]
    pub fn with_secondary_factory(mut self, factory: SecondaryFactory) -> Self {
        self.secondary_factory = Some(factory);
        self
    }

    /// Tool declarations passed along when native function calling is on.
    #[must_use]
    pub fn with_tool_specs(mut self, specs: Vec<ToolSpec>) -> Self {
        self.tool_specs = specs;
        self
    }

    /// System prompt attached to every primary-chain request.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// The shared breaker registry (process-wide, one breaker per model).
    pub const fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Build a cost tracker carrying this gateway's per-request budget.
    pub fn new_tracker(&self) -> QueryCostTracker {
        QueryCostTracker::new(
            self.config.max_fallback_depth,
            self.config.max_fallback_cost_usd,
        )
    }

    /// Send one message through the tier's fallback chain.
    ///
    /// On success the session is extended with the user turn and the
    /// model reply, and pinned to the model that answered. Mutates the
    /// per-model breakers and the caller's [`QueryCostTracker`].
    ///
    /// # Errors
    ///
    /// [`AgentError::AllModelsFailed`] only after every chain member was
    /// tried (or skipped by an open breaker) without success; budget
    /// violations and non-transient provider errors abort immediately.
    #[instrument(skip(self, session, message, images, tracker), fields(tier = %tier))]
    pub async fn send(
        &self,
        session: &mut ChatSession,
        message: &str,
        tier: ModelTier,
        images: &[ImageData],
        enable_function_calling: bool,
        tracker: &QueryCostTracker,
    ) -> Result<GatewayReply, AgentError> {
        let chain = tier.fallback_chain(&self.models);
        let mut last_error: Option<ProviderError> = None;
        tracker.reset_depth();

        for model in &chain {
            if self.breakers.is_open(model).await {
                debug!(model, "skipping model with open circuit");
                continue;
            }

            tracker.ensure_within_cost()?;
            tracker.begin_attempt()?;

            let mut messages = session.messages.clone();
            messages.push(ChatMessage::user(message));
            let request = GenerateRequest {
                model: model.clone(),
                system: self.system_prompt.clone(),
                messages,
                images: images.to_vec(),
                tools: if enable_function_calling {
                    self.tool_specs.clone()
                } else {
                    Vec::new()
                },
            };

            match self.provider.generate(&request).await {
                Ok(response) => {
                    self.breakers.record_success(model).await;
                    tracker.record_usage(model, response.usage);
                    session.messages.push(ChatMessage::user(message));
                    session.messages.push(ChatMessage::model(response.text.clone()));
                    session.model.clone_from(model);
                    info!(
                        model,
                        depth = tracker.depth(),
                        cost_usd = tracker.cost_usd(),
                        "generate succeeded"
                    );
                    return Ok(GatewayReply {
                        text: response.text.clone(),
                        model_used: model.clone(),
                        response,
                    });
                }
                Err(e) if e.is_transient() => {
                    self.breakers.record_failure(model).await;
                    warn!(model, error = %e, "transient provider failure, advancing chain");
                    last_error = Some(e);
                }
                Err(e) => {
                    self.breakers.record_failure(model).await;
                    error!(model, error = %e, "fatal provider failure");
                    return Err(AgentError::Provider(e));
                }
            }
        }

        Err(AgentError::AllModelsFailed {
            tier: tier.to_string(),
            last_error: last_error
                .map_or_else(|| "all circuit breakers open".to_string(), |e| e.to_string()),
        })
    }

    /// Direct, non-tiered call to the secondary provider.
    ///
    /// The secondary is instantiated once per gateway on first use. It is
    /// never part of any fallback chain; callers invoke it explicitly
    /// when they need an alternate model family.
    ///
    /// # Errors
    ///
    /// [`AgentError::ProviderUnavailable`] if no factory is configured,
    /// instantiation fails, or the call itself fails.
    pub async fn send_secondary(&self, prompt: &str) -> Result<GatewayReply, AgentError> {
        let factory = self
            .secondary_factory
            .as_ref()
            .ok_or_else(|| AgentError::ProviderUnavailable("no secondary provider configured".to_string()))?;

        let provider = self
            .secondary
            .get_or_try_init(|| async { factory() })
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let request = GenerateRequest {
            model: self.models.secondary.clone(),
            system: None,
            messages: vec![ChatMessage::user(prompt)],
            images: Vec::new(),
            tools: Vec::new(),
        };

        let response = provider
            .generate(&request)
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(GatewayReply {
            text: response.text.clone(),
            model_used: self.models.secondary.clone(),
            response,
        })
    }

    /// Build a chat session seeded with prior turns, pinned to the first
    /// model of the tier's chain.
    ///
    /// History is accepted as loose JSON (`[{"role": ..., "content": ...}]`);
    /// a non-array value or malformed entries degrade to an empty history
    /// rather than failing.
    pub fn create_session_with_history(&self, history: &Value, tier: ModelTier) -> ChatSession {
        let mut session = ChatSession::new(tier.entry_model(&self.models));

        let Some(items) = history.as_array() else {
            if !history.is_null() {
                warn!("non-list conversation history ignored");
            }
            return session;
        };

        for item in items {
            let Some(content) = item.get("content").and_then(Value::as_str) else {
                continue;
            };
            let message = match item.get("role").and_then(Value::as_str) {
                Some("user") => ChatMessage::user(content),
                Some("model" | "assistant") => ChatMessage::model(content),
                _ => continue,
            };
            session.messages.push(message);
        }
        session
    }

    /// Probe each tier entry-point model plus the secondary provider.
    ///
    /// Returns one boolean per probed target. When the gateway-wide
    /// `primary_disabled` flag is set, every primary-family probe reports
    /// `false` without a network call.
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let mut results = HashMap::new();
        let entry_models = [
            self.models.pro.clone(),
            self.models.flash.clone(),
            self.models.fallback.clone(),
        ];

        for model in entry_models {
            let healthy = if self.config.primary_disabled {
                false
            } else {
                self.probe_primary(&model).await
            };
            results.insert(model, healthy);
        }

        let secondary_healthy = self.send_secondary("ping").await.is_ok();
        results.insert("secondary".to_string(), secondary_healthy);
        results
    }

    async fn probe_primary(&self, model: &str) -> bool {
        let request = GenerateRequest {
            model: model.to_string(),
            system: None,
            messages: vec![ChatMessage::user("ping")],
            images: Vec::new(),
            tools: Vec::new(),
        };
        match self.provider.generate(&request).await {
            Ok(_) => true,
            Err(e) => {
                debug!(model, error = %e, "health probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TokenUsage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Scripted provider: per-model outcomes plus a call log.
    struct ScriptedProvider {
        outcomes: HashMap<String, Vec<Result<String, &'static str>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: HashMap<String, Vec<Result<String, &'static str>>>) -> Self {
            Self {
                outcomes,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.calls.lock().unwrap().push(request.model.clone());
            let outcome = self
                .outcomes
                .get(&request.model)
                .and_then(|v| v.first().cloned())
                .unwrap_or(Err("quota"));
            match outcome {
                Ok(text) => Ok(ProviderResponse::text_only(text, TokenUsage::new(10, 5))),
                Err("quota") => Err(ProviderError::QuotaExceeded("429".to_string())),
                Err("unavailable") => Err(ProviderError::ServiceUnavailable("503".to_string())),
                Err(_) => Err(ProviderError::InvalidRequest("400".to_string())),
            }
        }
    }

    fn models() -> ModelsConfig {
        ModelsConfig::default()
    }

    fn gateway_with(
        outcomes: HashMap<String, Vec<Result<String, &'static str>>>,
    ) -> (ModelGateway, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(outcomes));
        let gateway = ModelGateway::new(provider.clone(), models(), GatewayConfig::default());
        (gateway, provider)
    }

    #[tokio::test]
    async fn test_first_model_success_stops_chain() {
        let mut outcomes = HashMap::new();
        outcomes.insert("gemini-2.5-pro".to_string(), vec![Ok("hi".to_string())]);
        let (gateway, provider) = gateway_with(outcomes);

        let mut session = ChatSession::new("gemini-2.5-pro");
        let tracker = gateway.new_tracker();
        let reply = gateway
            .send(&mut session, "hello", ModelTier::Pro, &[], false, &tracker)
            .await
            .unwrap();

        assert_eq!(reply.model_used, "gemini-2.5-pro");
        assert_eq!(reply.text, "hi");
        assert_eq!(provider.calls(), vec!["gemini-2.5-pro"]);
        assert_eq!(tracker.depth(), 1);
        // Session extended with both turns.
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_transient_error_advances_chain_in_order() {
        let mut outcomes = HashMap::new();
        outcomes.insert("gemini-2.5-pro".to_string(), vec![Err("quota")]);
        outcomes.insert("gemini-2.5-flash".to_string(), vec![Err("unavailable")]);
        outcomes.insert("gemini-2.0-flash-lite".to_string(), vec![Ok("ok".to_string())]);
        let (gateway, provider) = gateway_with(outcomes);

        let mut session = ChatSession::new("gemini-2.5-pro");
        let tracker = gateway.new_tracker();
        let reply = gateway
            .send(&mut session, "q", ModelTier::Pro, &[], false, &tracker)
            .await
            .unwrap();

        assert_eq!(reply.model_used, "gemini-2.0-flash-lite");
        // Fallback monotonicity: chain order respected, nothing outside it.
        assert_eq!(
            provider.calls(),
            vec!["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.0-flash-lite"]
        );
        assert_eq!(tracker.depth(), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_chain() {
        let mut outcomes = HashMap::new();
        outcomes.insert("gemini-2.5-pro".to_string(), vec![Err("bad")]);
        let (gateway, provider) = gateway_with(outcomes);

        let mut session = ChatSession::new("gemini-2.5-pro");
        let tracker = gateway.new_tracker();
        let err = gateway
            .send(&mut session, "q", ModelTier::Pro, &[], false, &tracker)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Provider(_)));
        assert_eq!(provider.calls(), vec!["gemini-2.5-pro"]);
        // Session untouched on failure.
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn test_chain_exhaustion() {
        let (gateway, _) = gateway_with(HashMap::new());

        let mut session = ChatSession::new("gemini-2.0-flash-lite");
        let tracker = gateway.new_tracker();
        let err = gateway
            .send(&mut session, "q", ModelTier::Fallback, &[], false, &tracker)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::AllModelsFailed { .. }));
    }

    #[tokio::test]
    async fn test_open_breaker_skips_without_attempt() {
        let mut outcomes = HashMap::new();
        outcomes.insert("gemini-2.5-flash".to_string(), vec![Ok("ok".to_string())]);
        let (gateway, provider) = gateway_with(outcomes);

        for _ in 0..5 {
            gateway.breakers().record_failure("gemini-2.5-pro").await;
        }

        let mut session = ChatSession::new("gemini-2.5-pro");
        let tracker = gateway.new_tracker();
        let reply = gateway
            .send(&mut session, "q", ModelTier::Pro, &[], false, &tracker)
            .await
            .unwrap();

        assert_eq!(reply.model_used, "gemini-2.5-flash");
        // Skipped model was never called and consumed no depth.
        assert_eq!(provider.calls(), vec!["gemini-2.5-flash"]);
        assert_eq!(tracker.depth(), 1);
    }

    #[tokio::test]
    async fn test_depth_budget_aborts_mid_chain() {
        let (gateway, provider) = gateway_with(HashMap::new());

        let mut session = ChatSession::new("gemini-2.5-pro");
        let tracker = QueryCostTracker::new(1, 10.0);
        let err = gateway
            .send(&mut session, "q", ModelTier::Pro, &[], false, &tracker)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::FallbackDepthExceeded { .. }));
        assert_eq!(provider.calls(), vec!["gemini-2.5-pro"]);
    }

    #[tokio::test]
    async fn test_secondary_is_lazy_and_direct() {
        let (gateway, _) = gateway_with(HashMap::new());
        let secondary = Arc::new(ScriptedProvider::new({
            let mut m = HashMap::new();
            m.insert("gpt-4o-mini".to_string(), vec![Ok("alt".to_string())]);
            m
        }));
        let secondary_for_factory = secondary.clone();
        let gateway = gateway.with_secondary_factory(Box::new(move || {
            Ok(secondary_for_factory.clone() as Arc<dyn ModelProvider>)
        }));

        assert!(secondary.calls().is_empty());
        let reply = gateway.send_secondary("hello").await.unwrap();
        assert_eq!(reply.text, "alt");
        assert_eq!(secondary.calls(), vec!["gpt-4o-mini"]);
    }

    #[tokio::test]
    async fn test_secondary_unconfigured() {
        let (gateway, _) = gateway_with(HashMap::new());
        let err = gateway.send_secondary("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_session_history_seeding() {
        let (gateway, _) = gateway_with(HashMap::new());
        let history = json!([
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"},
            {"role": "model", "content": "again"},
            {"role": "user"},
            "garbage"
        ]);

        let session = gateway.create_session_with_history(&history, ModelTier::Flash);
        assert_eq!(session.model, "gemini-2.5-flash");
        assert_eq!(session.messages.len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_history_is_empty() {
        let (gateway, _) = gateway_with(HashMap::new());
        let session =
            gateway.create_session_with_history(&json!({"not": "a list"}), ModelTier::Pro);
        assert!(session.messages.is_empty());
        assert_eq!(session.model, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn test_health_check_primary_disabled_short_circuits() {
        let provider = Arc::new(ScriptedProvider::new(HashMap::new()));
        let config = GatewayConfig {
            primary_disabled: true,
            ..Default::default()
        };
        let gateway = ModelGateway::new(provider.clone(), models(), config);

        let health = gateway.health_check().await;
        assert!(!health["gemini-2.5-pro"]);
        assert!(!health["gemini-2.5-flash"]);
        assert!(!health["gemini-2.0-flash-lite"]);
        assert!(!health["secondary"]);
        // No primary probe ever reached the provider.
        assert!(provider.calls().is_empty());
    }
}
