//! Pure domain data models.

pub mod agent;
pub mod config;
pub mod stream;
pub mod tier;
pub mod tool_call;
pub mod usage;

pub use agent::{AgentState, SourceRef};
pub use config::{Config, EngineConfig, GatewayConfig, LoggingConfig, ModelsConfig};
pub use stream::StreamEvent;
pub use tier::ModelTier;
pub use tool_call::ToolCall;
pub use usage::TokenUsage;
