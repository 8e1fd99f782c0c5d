//! Tool-call extraction from model output.
//!
//! Two strategies: native structured function calls (preferred when the
//! provider supports them) and a regex fallback that recognizes
//! `ACTION: tool_name(args)` lines in free text. Both normalize to the
//! same [`ToolCall`] shape so the executor never cares which path
//! produced it.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::models::ToolCall;
use crate::domain::ports::ProviderResponse;

/// `ACTION: name(args)` with optional parens and arbitrary surrounding
/// text. The argument capture admits parens only inside quoted values,
/// so prose after the call (which may itself contain parens) is never
/// swallowed into the argument list.
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"ACTION:\s*(\w+)\s*(?:\(((?:"[^"]*"|'[^']*'|[^()])*)\))?"#)
        .expect("action regex is valid")
});

/// `key="value"` or `key='value'`, whitespace-tolerant around `=`.
static KV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(\w+)\s*=\s*(?:"([^"]*)"|'([^']*)')\s*$"#).expect("kv regex is valid")
});

/// A sole quoted literal, e.g. `"rust lifetimes"` or `'2+2'`.
static BARE_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:"([^"]*)"|'([^']*)')\s*$"#).expect("literal regex is valid")
});

/// What the parser is looking at: a full provider response (native path
/// available) or bare text (regex only).
pub enum ParserInput<'a> {
    Response(&'a ProviderResponse),
    Text(&'a str),
}

/// Tools that accept a single positional argument, and the parameter
/// name a bare quoted literal maps onto.
fn positional_param(tool: &str) -> Option<&'static str> {
    match tool {
        "vector_search" | "web_search" => Some("query"),
        "calculator" => Some("expression"),
        _ => None,
    }
}

/// Extract a tool call from a provider's native function-calling field.
///
/// `null` arguments normalize to an empty map; a non-object argument
/// payload or an empty name yields no call.
pub fn parse_native(response: &ProviderResponse) -> Option<ToolCall> {
    let call = response.function_call.as_ref()?;
    if call.name.is_empty() {
        return None;
    }
    let arguments = match &call.arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        other => {
            warn!(tool = %call.name, args = %other, "non-object native arguments dropped");
            return None;
        }
    };
    Some(ToolCall::new(call.name.clone(), arguments))
}

/// Extract a tool call from free text via the `ACTION:` convention.
///
/// Recognized argument shapes, in order:
/// - no parens or empty parens: zero-argument call
/// - a sole quoted literal, for tools with a known positional parameter
/// - comma-separated `key="value"` pairs
///
/// A malformed argument list yields no call at all rather than a call
/// with partial arguments.
pub fn parse_regex(text: &str) -> Option<ToolCall> {
    let captures = ACTION_RE.captures(text)?;
    let name = captures.get(1)?.as_str().to_string();

    let Some(raw_args) = captures.get(2).map(|m| m.as_str()) else {
        return Some(ToolCall::bare(name));
    };
    if raw_args.trim().is_empty() {
        return Some(ToolCall::bare(name));
    }

    if let Some(literal) = BARE_LITERAL_RE.captures(raw_args) {
        let value = literal
            .get(1)
            .or_else(|| literal.get(2))
            .map_or("", |m| m.as_str());
        return Some(match positional_param(&name) {
            Some(param) => {
                let mut arguments = Map::new();
                arguments.insert(param.to_string(), Value::String(value.to_string()));
                ToolCall::new(name, arguments)
            }
            // Unknown tool with a positional literal: the literal has no
            // parameter name to attach to, so it is dropped.
            None => ToolCall::bare(name),
        });
    }

    let mut arguments = Map::new();
    for part in raw_args.split(',') {
        let Some(kv) = KV_RE.captures(part) else {
            debug!(tool = %name, part, "malformed argument pair, discarding call");
            return None;
        };
        let key = kv.get(1).map_or("", |m| m.as_str());
        let value = kv.get(2).or_else(|| kv.get(3)).map_or("", |m| m.as_str());
        arguments.insert(key.to_string(), Value::String(value.to_string()));
    }
    Some(ToolCall::new(name, arguments))
}

/// Unified entry point: try the native field first when enabled, then
/// fall back to the `ACTION:` scan of the response text.
pub fn parse(input: &ParserInput<'_>, use_native: bool) -> Option<ToolCall> {
    match input {
        ParserInput::Response(response) => {
            if use_native {
                if let Some(call) = parse_native(response) {
                    return Some(call);
                }
            }
            parse_regex(&response.text)
        }
        ParserInput::Text(text) => parse_regex(text),
    }
}
