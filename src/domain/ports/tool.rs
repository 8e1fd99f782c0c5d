//! Port trait for executable tools.
//!
//! Tool implementations (vector search, calculators, pricing lookups)
//! are external collaborators; the engine depends only on this contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::model_provider::ToolSpec;

/// A callable tool the reasoning engine can dispatch to.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registered name, matched against parsed tool calls.
    fn name(&self) -> &str;

    /// Human/model-readable description, surfaced in tool declarations.
    fn description(&self) -> &str;

    /// JSON schema for the tool's named arguments.
    fn parameters(&self) -> Value;

    /// Run the tool. Business-logic failures should be returned as `Err`;
    /// the executor converts them into observation strings rather than
    /// propagating.
    async fn execute(&self, arguments: &Map<String, Value>) -> anyhow::Result<String>;
}

/// Tool registry: name -> implementation, resolved once at engine
/// construction. Dynamic dispatch over tool names without reflection.
pub type ToolRegistry = HashMap<String, Arc<dyn Tool>>;

/// Build provider-facing tool declarations from a registry.
pub fn tool_specs(registry: &ToolRegistry) -> Vec<ToolSpec> {
    let mut specs: Vec<ToolSpec> = registry
        .values()
        .map(|tool| ToolSpec {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        })
        .collect();
    // HashMap iteration order is unstable; keep declarations deterministic.
    specs.sort_by(|a, b| a.name.cmp(&b.name));
    specs
}
