//! Ports: traits the services depend on, implemented by adapters or
//! external collaborators.

pub mod metrics;
pub mod model_provider;
pub mod tool;
pub mod verifier;

pub use metrics::{MetricsSink, NullMetrics, ToolCallOutcome};
pub use model_provider::{
    ChatMessage, FunctionCall, GenerateRequest, ImageData, ModelProvider, ProviderError,
    ProviderResponse, Role, ToolSpec,
};
pub use tool::{tool_specs, Tool, ToolRegistry};
pub use verifier::{AnswerVerifier, Verification};
