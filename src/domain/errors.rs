//! Request-level error taxonomy.
//!
//! Transient provider errors are recovered inside the gateway via
//! fallback-chain advancement and never appear here; these variants are
//! the fatal outcomes a caller can actually observe.

use thiserror::Error;

use super::ports::ProviderError;

/// Fatal errors surfaced by the gateway, executor, or engine.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Every model in the tier's fallback chain was tried and failed.
    #[error("all models failed for tier '{tier}': {last_error}")]
    AllModelsFailed {
        /// Tier whose chain was exhausted.
        tier: String,
        /// The last provider error seen while walking the chain.
        last_error: String,
    },

    /// The secondary (non-tiered) provider could not serve the request.
    #[error("secondary provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Per-conversation tool execution ceiling reached.
    #[error("tool execution limit reached ({count} calls)")]
    RateLimitExceeded {
        /// Executions already performed in this conversation.
        count: u32,
    },

    /// More models were attempted than the per-request fallback budget allows.
    #[error("fallback depth {depth} exceeds limit of {max}")]
    FallbackDepthExceeded { depth: u32, max: u32 },

    /// Per-request spend crossed the cost ceiling.
    #[error("fallback cost ${cost:.4} exceeds limit of ${max:.4}")]
    FallbackCostExceeded { cost: f64, max: f64 },

    /// A request-fatal provider error (anything non-transient).
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AgentError {
    /// True when the failure stems from provider-side transience
    /// (quota/unavailability) rather than a bug or budget violation.
    /// The engine degrades to a context-derived answer in this case if
    /// any context was already gathered.
    pub const fn is_degradable(&self) -> bool {
        match self {
            Self::AllModelsFailed { .. } => true,
            Self::Provider(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradable_errors() {
        let exhausted = AgentError::AllModelsFailed {
            tier: "pro".to_string(),
            last_error: "quota".to_string(),
        };
        assert!(exhausted.is_degradable());

        let rate = AgentError::RateLimitExceeded { count: 10 };
        assert!(!rate.is_degradable());

        let depth = AgentError::FallbackDepthExceeded { depth: 4, max: 3 };
        assert!(!depth.is_degradable());
    }

    #[test]
    fn test_display_messages() {
        let err = AgentError::FallbackCostExceeded { cost: 0.75, max: 0.5 };
        assert!(err.to_string().contains("$0.7500"));
        let err = AgentError::RateLimitExceeded { count: 10 };
        assert!(err.to_string().contains("10"));
    }
}
