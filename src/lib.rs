//! Reagent - Agentic Reasoning Runtime
//!
//! Reagent turns a user query into a multi-step, tool-augmented answer by
//! driving a Thought -> Action -> Observation (ReAct) loop against tiered
//! LLM back-ends, tolerating provider outages, quota exhaustion, and
//! malformed model output.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure data models, ports, and the error taxonomy
//! - **Service Layer** (`services`): Gateway, parser, executor, and the reasoning engine
//! - **Infrastructure Layer** (`infrastructure`): Provider HTTP clients, config, logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use reagent::services::ReasoningEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Build a gateway + engine and answer a query
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::AgentError;
pub use domain::models::{
    AgentState, Config, EngineConfig, GatewayConfig, LoggingConfig, ModelTier, ModelsConfig,
    SourceRef, StreamEvent, TokenUsage, ToolCall,
};
pub use domain::ports::{
    AnswerVerifier, MetricsSink, ModelProvider, ProviderError, ProviderResponse, Tool,
    ToolCallOutcome, ToolRegistry,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BreakerRegistry, ChatSession, ModelGateway, QueryCostTracker, ReasoningEngine, ToolExecutor,
};
