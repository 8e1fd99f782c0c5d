//! Tool dispatch with a per-conversation execution ceiling.
//!
//! The executor is the single choke point between the reasoning loop and
//! registered tools: it enforces the call ceiling, injects the caller's
//! identity, times every call, and reports one metrics outcome per
//! dispatch. Tool failures become observations, never request errors,
//! so the loop can reason about them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::domain::errors::AgentError;
use crate::domain::ports::{MetricsSink, ToolCallOutcome, ToolRegistry};

/// Counts tool executions within one conversation.
///
/// Shared across the turns of a session; rejected and unknown-tool
/// dispatches do not advance it.
#[derive(Debug, Default)]
pub struct ExecutionCounter {
    count: AtomicU32,
}

impl ExecutionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Dispatches parsed tool calls against a registry.
pub struct ToolExecutor {
    metrics: Arc<dyn MetricsSink>,
    ceiling: u32,
}

impl ToolExecutor {
    pub fn new(metrics: Arc<dyn MetricsSink>, ceiling: u32) -> Self {
        Self { metrics, ceiling }
    }

    /// Execute one tool call.
    ///
    /// Returns the observation text and the call duration in seconds.
    /// An unknown tool and a failing tool both produce an `Error: ...`
    /// observation rather than an `Err`; only the execution ceiling is a
    /// hard error.
    ///
    /// # Errors
    ///
    /// [`AgentError::RateLimitExceeded`] once the conversation has
    /// already used `ceiling` executions.
    #[instrument(skip(self, registry, arguments, counter), fields(tool = %name))]
    pub async fn execute(
        &self,
        registry: &ToolRegistry,
        name: &str,
        arguments: &Map<String, Value>,
        user_id: Option<&str>,
        counter: &ExecutionCounter,
    ) -> Result<(String, f64), AgentError> {
        let used = counter.count();
        if used >= self.ceiling {
            warn!(used, ceiling = self.ceiling, "tool execution ceiling reached");
            self.metrics
                .record_tool_call(name, ToolCallOutcome::RateLimited);
            return Err(AgentError::RateLimitExceeded { count: used });
        }

        let Some(tool) = registry.get(name) else {
            warn!("unknown tool requested");
            self.metrics.record_tool_call(name, ToolCallOutcome::Unknown);
            return Ok((format!("Error: Unknown tool '{name}'"), 0.0));
        };

        counter.increment();

        let mut arguments = arguments.clone();
        if let Some(user_id) = user_id.filter(|id| !id.is_empty()) {
            arguments.insert("user_id".to_string(), Value::String(user_id.to_string()));
        }

        let started = Instant::now();
        let result = tool.execute(&arguments).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(observation) => {
                info!(elapsed_secs = elapsed, "tool call succeeded");
                self.metrics.record_tool_call(name, ToolCallOutcome::Success);
                Ok((observation, elapsed))
            }
            Err(e) => {
                warn!(elapsed_secs = elapsed, error = %e, "tool call failed");
                self.metrics.record_tool_call(name, ToolCallOutcome::Error);
                Ok((format!("Error executing {name}: {e}"), elapsed))
            }
        }
    }
}
