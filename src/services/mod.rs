//! Service layer: the gateway, parser, executor, and reasoning engine.

pub mod circuit_breaker;
pub mod cost_tracker;
pub mod engine;
pub mod evidence;
pub mod executor;
pub mod gateway;
pub mod parser;

pub use circuit_breaker::{BreakerConfig, BreakerRegistry, CircuitBreaker};
pub use cost_tracker::QueryCostTracker;
pub use engine::{AgentOutcome, ReasoningEngine};
pub use executor::{ExecutionCounter, ToolExecutor};
pub use gateway::{ChatSession, GatewayReply, ModelGateway, SecondaryFactory};
