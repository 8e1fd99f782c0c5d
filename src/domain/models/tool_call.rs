//! Normalized tool invocations extracted from model output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single tool invocation, produced by the parser and consumed once by
/// the executor. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Registered tool name (e.g. `vector_search`).
    pub name: String,
    /// Named arguments for the tool. Null/absent arguments normalize to
    /// an empty map rather than a missing field.
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// A call with no arguments.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_call_has_empty_arguments() {
        let call = ToolCall::bare("calculator");
        assert_eq!(call.name, "calculator");
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_serialization_shape() {
        let mut args = Map::new();
        args.insert("query".to_string(), json!("visa requirements"));
        let call = ToolCall::new("vector_search", args);
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(value["name"], "vector_search");
        assert_eq!(value["arguments"]["query"], "visa requirements");
    }
}
