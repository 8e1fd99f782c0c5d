//! Streaming event contract.
//!
//! The engine's streaming variant emits an ordered sequence of these
//! events over a bounded channel. Any transport (HTTP chunked response,
//! WebSocket) can consume them; this core defines only shapes and
//! ordering.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::agent::SourceRef;

/// A single event in a streamed answer.
///
/// Ordering contract: zero or more `Token` events, then exactly one
/// `Sources` event once citations are finalized, optional `Metadata`,
/// and a terminal `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of the answer text.
    Token { text: String },
    /// Finalized citations for the answer.
    Sources { sources: Vec<SourceRef> },
    /// Auxiliary request info (steps taken, cost, model used).
    Metadata { data: Value },
    /// Terminal failure after partial output was already emitted.
    Error { message: String },
    /// Terminal success marker.
    Done,
}

impl StreamEvent {
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// True for `Done` and `Error`, the two terminal kinds.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_kinds() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::error("boom").is_terminal());
        assert!(!StreamEvent::token("hi").is_terminal());
    }

    #[test]
    fn test_tagged_serialization() {
        let event = StreamEvent::token("hello");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "token");
        assert_eq!(value["text"], "hello");

        let done = serde_json::to_value(StreamEvent::Done).unwrap();
        assert_eq!(done["type"], "done");
    }
}
