//! Port for the process-wide metrics collaborator.

/// Outcome of a single tool execution, reported once per `execute()` call
/// regardless of which path was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallOutcome {
    /// Tool ran and returned a result string.
    Success,
    /// Tool ran and failed; the failure was converted to an observation.
    Error,
    /// The requested tool was not in the registry.
    Unknown,
    /// The per-conversation execution ceiling rejected the call.
    RateLimited,
}

impl ToolCallOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Unknown => "unknown",
            Self::RateLimited => "rate_limited",
        }
    }
}

/// Metrics sink shared across all in-flight sessions; implementations
/// must tolerate concurrent calls.
pub trait MetricsSink: Send + Sync {
    /// Record one tool-call outcome.
    fn record_tool_call(&self, tool: &str, outcome: ToolCallOutcome);
}

/// No-op sink used when no metrics collaborator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn record_tool_call(&self, _tool: &str, _outcome: ToolCallOutcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ToolCallOutcome::Success.as_str(), "success");
        assert_eq!(ToolCallOutcome::Error.as_str(), "error");
        assert_eq!(ToolCallOutcome::Unknown.as_str(), "unknown");
        assert_eq!(ToolCallOutcome::RateLimited.as_str(), "rate_limited");
    }
}
