//! Per-query reasoning session state.
//!
//! An [`AgentState`] is created once per user query, mutated only by the
//! reasoning engine, and discarded after the response is returned or
//! streamed. Nothing here is persisted; conversation storage is an
//! external collaborator's job.

use serde::{Deserialize, Serialize};

/// A citation-like record extracted from tool observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Human-readable title of the source document.
    #[serde(default)]
    pub title: String,
    /// Link to the source, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Short excerpt supporting the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// The reasoning session for a single user query.
///
/// `context_gathered` and `sources` are append-only; `current_step` only
/// moves forward; `final_answer` is set exactly once when the session
/// reaches a terminal state.
#[derive(Debug, Clone)]
pub struct AgentState {
    /// The user query. Immutable for the lifetime of the session.
    pub query: String,
    /// Upper bound on reasoning steps.
    pub max_steps: u32,
    /// Steps taken so far (0..=max_steps).
    pub current_step: u32,
    /// Ordered observation strings from tool executions.
    pub context_gathered: Vec<String>,
    /// Intermediate model text that was neither a tool call nor a final
    /// answer. Feeds back into the next step's prompt.
    pub thoughts: Vec<String>,
    /// Citations extracted from JSON-shaped observations.
    pub sources: Vec<SourceRef>,
    /// Set when the session reaches a terminal state.
    pub final_answer: Option<String>,
}

impl AgentState {
    pub fn new(query: impl Into<String>, max_steps: u32) -> Self {
        Self {
            query: query.into(),
            max_steps,
            current_step: 0,
            context_gathered: Vec::new(),
            thoughts: Vec::new(),
            sources: Vec::new(),
            final_answer: None,
        }
    }

    /// True while the loop may take another step.
    pub fn is_running(&self) -> bool {
        self.final_answer.is_none() && self.current_step < self.max_steps
    }

    /// Total characters of gathered observations (evidence-volume signal).
    pub fn context_chars(&self) -> usize {
        self.context_gathered.iter().map(String::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_running() {
        let state = AgentState::new("what is the visa process?", 5);
        assert!(state.is_running());
        assert_eq!(state.current_step, 0);
        assert!(state.context_gathered.is_empty());
    }

    #[test]
    fn test_terminal_once_answer_set() {
        let mut state = AgentState::new("q", 5);
        state.final_answer = Some("done".to_string());
        assert!(!state.is_running());
    }

    #[test]
    fn test_terminal_at_max_steps() {
        let mut state = AgentState::new("q", 2);
        state.current_step = 2;
        assert!(!state.is_running());
    }

    #[test]
    fn test_context_chars_sums_observations() {
        let mut state = AgentState::new("q", 5);
        state.context_gathered.push("abcd".to_string());
        state.context_gathered.push("ef".to_string());
        assert_eq!(state.context_chars(), 6);
    }
}
