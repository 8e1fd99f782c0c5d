//! Token usage attached to successful gateway calls.

use serde::{Deserialize, Serialize};

/// Token counts for a single provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt (input).
    pub prompt_tokens: u64,
    /// Tokens generated in the completion (output).
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub const fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Total tokens across prompt and completion.
    pub const fn total(self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Sum two usage records (for accumulating across fallback hops).
    pub const fn add(self, other: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
        }
    }
}
