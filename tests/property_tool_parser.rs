use proptest::prelude::*;
use serde_json::Value;

use reagent::services::parser::parse_regex;

fn tool_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

/// Argument values that cannot themselves contain quote or delimiter
/// characters, so the round trip is unambiguous.
fn arg_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._-]{0,20}"
}

proptest! {
    /// Property: a well-formed key="value" argument list always parses
    /// back to exactly the written pairs.
    #[test]
    fn prop_kv_arguments_round_trip(
        name in tool_name(),
        keys in proptest::collection::vec("[a-z][a-z0-9_]{0,8}", 1..4),
        values in proptest::collection::vec(arg_value(), 4),
    ) {
        // Deduplicate keys; a duplicate key would legitimately collapse.
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            if !pairs.iter().any(|(k, _)| k == key) {
                pairs.push((key.clone(), values[i].clone()));
            }
        }

        let args = pairs
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let text = format!("Some reasoning first. ACTION: {name}({args})");

        let call = parse_regex(&text).expect("well-formed call should parse");
        prop_assert_eq!(&call.name, &name);
        prop_assert_eq!(call.arguments.len(), pairs.len());
        for (k, v) in &pairs {
            prop_assert_eq!(
                call.arguments.get(k).and_then(Value::as_str),
                Some(v.as_str())
            );
        }
    }

    /// Property: text without the action keyword never yields a call.
    #[test]
    fn prop_no_action_no_call(text in "[a-zA-Z0-9 .,!?]{0,200}") {
        prop_assume!(!text.contains("ACTION:"));
        prop_assert!(parse_regex(&text).is_none());
    }

    /// Property: a sole quoted literal on a known single-argument tool
    /// always lands in its positional parameter.
    #[test]
    fn prop_positional_literal(query in "[a-zA-Z0-9 ._-]{0,30}") {
        let text = format!("ACTION: vector_search(\"{query}\")");
        let call = parse_regex(&text).expect("positional call should parse");
        prop_assert_eq!(&call.name, "vector_search");
        prop_assert_eq!(
            call.arguments.get("query").and_then(Value::as_str),
            Some(query.as_str())
        );
    }

    /// Property: an unquoted value is malformed and discards the whole
    /// call rather than producing partial arguments.
    #[test]
    fn prop_unquoted_value_is_rejected(
        name in tool_name(),
        key in "[a-z][a-z0-9_]{0,8}",
        value in "[a-zA-Z0-9]{1,10}",
    ) {
        let text = format!("ACTION: {name}({key}={value})");
        prop_assert!(parse_regex(&text).is_none());
    }
}
