//! End-to-end tests of the reasoning loop against scripted providers
//! and tools: gateway fallback, tool dispatch with the execution
//! ceiling, and the streaming contract, all through the public API.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use reagent::domain::ports::{
    FunctionCall, GenerateRequest, NullMetrics, ProviderError, ToolSpec,
};
use reagent::services::{ModelGateway, ReasoningEngine};
use reagent::{
    AgentError, EngineConfig, GatewayConfig, MetricsSink, ModelProvider, ModelTier, ModelsConfig,
    ProviderResponse, StreamEvent, Tool, TokenUsage, ToolCallOutcome, ToolRegistry,
};

/// One scripted reaction per provider call, regardless of model.
enum Step {
    Text(&'static str),
    Call(&'static str, Value),
    Quota,
}

struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    models_called: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            models_called: Mutex::new(Vec::new()),
        })
    }

    fn models_called(&self) -> Vec<String> {
        self.models_called.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ProviderResponse, ProviderError> {
        self.models_called
            .lock()
            .unwrap()
            .push(request.model.clone());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Quota);
        match step {
            Step::Text(text) => Ok(ProviderResponse::text_only(text, TokenUsage::new(20, 10))),
            Step::Call(name, arguments) => Ok(ProviderResponse {
                text: String::new(),
                function_call: Some(FunctionCall {
                    name: name.to_string(),
                    arguments,
                }),
                usage: TokenUsage::new(20, 10),
                raw: Value::Null,
            }),
            Step::Quota => Err(ProviderError::QuotaExceeded("429".to_string())),
        }
    }
}

struct LookupTool {
    payload: String,
    calls: AtomicU32,
}

#[async_trait]
impl Tool for LookupTool {
    fn name(&self) -> &str {
        "lookup"
    }

    fn description(&self) -> &str {
        "Look up a fact"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {"key": {"type": "string"}}})
    }

    async fn execute(&self, _arguments: &Map<String, Value>) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.payload.clone())
    }
}

struct RecordingMetrics {
    outcomes: Mutex<Vec<(String, ToolCallOutcome)>>,
}

impl MetricsSink for RecordingMetrics {
    fn record_tool_call(&self, tool: &str, outcome: ToolCallOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .push((tool.to_string(), outcome));
    }
}

fn registry_with(tool: Arc<LookupTool>) -> ToolRegistry {
    let mut registry: ToolRegistry = HashMap::new();
    registry.insert("lookup".to_string(), tool);
    registry
}

fn build_engine(
    provider: Arc<ScriptedProvider>,
    tools: ToolRegistry,
    metrics: Arc<dyn MetricsSink>,
    engine_config: EngineConfig,
) -> ReasoningEngine {
    let specs: Vec<ToolSpec> = reagent::domain::ports::tool_specs(&tools);
    let gateway = Arc::new(
        ModelGateway::new(provider, ModelsConfig::default(), GatewayConfig::default())
            .with_tool_specs(specs),
    );
    ReasoningEngine::new(gateway, tools, metrics, engine_config)
}

#[tokio::test]
async fn test_full_react_flow_with_tool_and_final_answer() {
    let provider = ScriptedProvider::new(vec![
        Step::Text("I should look this up first."),
        Step::Call("lookup", json!({"key": "capital"})),
        Step::Text("FINAL ANSWER: The capital is Quito."),
    ]);
    let tool = Arc::new(LookupTool {
        payload: r#"{"fact": "Quito", "sources": [{"title": "Atlas"}]}"#.to_string(),
        calls: AtomicU32::new(0),
    });
    let metrics = Arc::new(RecordingMetrics {
        outcomes: Mutex::new(Vec::new()),
    });
    let engine = build_engine(
        provider.clone(),
        registry_with(tool.clone()),
        metrics.clone(),
        EngineConfig::default(),
    );

    let outcome = engine
        .run("capital of Ecuador?", Some("u-1"), &Value::Null, ModelTier::Pro)
        .await
        .unwrap();

    assert!(outcome.answer.contains("The capital is Quito."));
    assert_eq!(outcome.steps_taken, 3);
    assert_eq!(tool.calls.load(Ordering::Relaxed), 1);
    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].title, "Atlas");
    assert!(outcome.cost_usd > 0.0);
    assert_eq!(
        metrics.outcomes.lock().unwrap().as_slice(),
        &[("lookup".to_string(), ToolCallOutcome::Success)]
    );
}

#[tokio::test]
async fn test_gateway_falls_back_in_chain_order_within_one_step() {
    // Pro hits quota, flash answers: the engine never notices.
    let provider = ScriptedProvider::new(vec![
        Step::Quota,
        Step::Text("FINAL ANSWER: served by the mid tier"),
    ]);
    let engine = build_engine(
        provider.clone(),
        HashMap::new(),
        Arc::new(NullMetrics),
        EngineConfig::default(),
    );

    let outcome = engine
        .run("q", None, &Value::Null, ModelTier::Pro)
        .await
        .unwrap();

    assert!(outcome.answer.contains("served by the mid tier"));
    assert_eq!(
        provider.models_called(),
        vec!["gemini-2.5-pro", "gemini-2.5-flash"]
    );
}

#[tokio::test]
async fn test_tool_ceiling_is_fatal_on_the_eleventh_call() {
    // The model asks for the tool forever; the ceiling cuts it off.
    let script: Vec<Step> = (0..12)
        .map(|_| Step::Call("lookup", json!({"key": "again"})))
        .collect();
    let provider = ScriptedProvider::new(script);
    let tool = Arc::new(LookupTool {
        payload: "short fact".to_string(),
        calls: AtomicU32::new(0),
    });
    let metrics = Arc::new(RecordingMetrics {
        outcomes: Mutex::new(Vec::new()),
    });
    let config = EngineConfig {
        max_steps: 20,
        ..Default::default()
    };
    let engine = build_engine(
        provider,
        registry_with(tool.clone()),
        metrics.clone(),
        config,
    );

    let err = engine
        .run("q", None, &Value::Null, ModelTier::Pro)
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::RateLimitExceeded { count: 10 }));
    // Exactly ten executions ran; the eleventh was rejected.
    assert_eq!(tool.calls.load(Ordering::Relaxed), 10);
    let outcomes = metrics.outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 11);
    assert!(outcomes[..10]
        .iter()
        .all(|(_, o)| *o == ToolCallOutcome::Success));
    assert_eq!(outcomes[10].1, ToolCallOutcome::RateLimited);
}

#[tokio::test]
async fn test_streaming_contract_end_to_end() {
    let provider = ScriptedProvider::new(vec![
        Step::Call("lookup", json!({"key": "k"})),
        Step::Text("FINAL ANSWER: streamed result built from the lookup observation"),
    ]);
    let tool = Arc::new(LookupTool {
        payload: r#"{"fact": "x", "sources": [{"title": "Doc", "url": "https://example.com"}]}"#
            .to_string(),
        calls: AtomicU32::new(0),
    });
    let engine = build_engine(
        provider,
        registry_with(tool),
        Arc::new(NullMetrics),
        EngineConfig::default(),
    );

    let mut rx = engine
        .stream_answer("q", None, &Value::Null, ModelTier::Pro)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    // Tokens first, then sources, then metadata, then the terminal done.
    let token_count = events
        .iter()
        .take_while(|e| matches!(e, StreamEvent::Token { .. }))
        .count();
    assert!(token_count >= 1);
    match &events[token_count] {
        StreamEvent::Sources { sources } => {
            assert_eq!(sources.len(), 1);
            assert_eq!(sources[0].title, "Doc");
        }
        other => panic!("expected sources event, got {other:?}"),
    }
    match &events[token_count + 1] {
        StreamEvent::Metadata { data } => {
            assert_eq!(data["steps"], 2);
        }
        other => panic!("expected metadata event, got {other:?}"),
    }
    assert_eq!(events[token_count + 2], StreamEvent::Done);
}

#[tokio::test]
async fn test_dropped_stream_receiver_stops_producer() {
    let provider = ScriptedProvider::new(vec![Step::Text(
        "FINAL ANSWER: a long answer that would stream as many chunks of text if anyone kept \
         listening to the channel, which nobody does in this test",
    )]);
    let engine = build_engine(
        provider,
        HashMap::new(),
        Arc::new(NullMetrics),
        EngineConfig::default(),
    );

    let mut rx = engine
        .stream_answer("q", None, &Value::Null, ModelTier::Pro)
        .await
        .unwrap();

    // Take one event, then drop the receiver; the producer task must
    // terminate instead of blocking on a full channel forever.
    let first = rx.recv().await.unwrap();
    assert!(matches!(first, StreamEvent::Token { .. }));
    drop(rx);
    tokio::task::yield_now().await;
}
