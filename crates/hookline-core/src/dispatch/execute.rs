//! Execution preparation: sub-block state resolution, `responseFormat`
//! normalization, and workflow-variable parsing.
//!
//! `responseFormat` may be stored as a JSON string, a bare JSON schema, or
//! an already-enveloped `{name, schema, strict}` object; the first two are
//! normalized into the third. Parse failures are non-fatal -- the raw value
//! is kept and a warning logged.

use std::collections::HashMap;

use hookline_types::workflow::WorkflowGraph;
use serde_json::{Map, Value, json};

/// Sub-block id whose value needs structured-output normalization.
const RESPONSE_FORMAT_KEY: &str = "responseFormat";

/// Merge each block's sub-block state into a per-block parameter map and
/// normalize special fields.
pub fn resolve_block_states(graph: &WorkflowGraph) -> HashMap<String, HashMap<String, Value>> {
    let mut states = HashMap::with_capacity(graph.blocks.len());

    for (block_id, block) in &graph.blocks {
        let mut params = HashMap::with_capacity(block.sub_blocks.len());
        for (sub_id, sub) in &block.sub_blocks {
            let value = sub.value.clone().unwrap_or(Value::Null);
            let value = if sub_id == RESPONSE_FORMAT_KEY {
                match normalize_response_format(&value) {
                    Ok(normalized) => normalized,
                    Err(reason) => {
                        tracing::warn!(
                            block_id = %block_id,
                            %reason,
                            "responseFormat could not be normalized; keeping raw value"
                        );
                        value
                    }
                }
            } else {
                value
            };
            params.insert(sub_id.clone(), value);
        }
        states.insert(block_id.clone(), params);
    }

    states
}

/// Normalize a `responseFormat` value into a `{name, schema, strict}`
/// envelope.
///
/// - JSON strings are re-parsed (empty strings become null).
/// - Bare JSON-schema objects (with `type`/`properties` but no `schema`)
///   are wrapped.
/// - Already-enveloped objects pass through.
pub fn normalize_response_format(raw: &Value) -> Result<Value, String> {
    let parsed = match raw {
        Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
        Value::String(s) => {
            serde_json::from_str::<Value>(s).map_err(|e| format!("invalid JSON string: {e}"))?
        }
        other => other.clone(),
    };

    let Value::Object(obj) = &parsed else {
        return Ok(parsed);
    };

    if obj.contains_key("schema") {
        return Ok(parsed);
    }

    if looks_like_json_schema(obj) {
        return Ok(json!({
            "name": "response_format",
            "schema": parsed,
            "strict": true,
        }));
    }

    Ok(parsed)
}

fn looks_like_json_schema(obj: &Map<String, Value>) -> bool {
    obj.contains_key("type") || obj.contains_key("properties")
}

/// Parse workflow-level variables, tolerating either a JSON string or an
/// already-parsed object. Errors are non-fatal and yield an empty map.
pub fn parse_variables(raw: Option<&Value>) -> HashMap<String, Value> {
    let value = match raw {
        None | Some(Value::Null) => return HashMap::new(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "workflow variables are not valid JSON; ignoring");
                return HashMap::new();
            }
        },
        Some(other) => other.clone(),
    };

    match value {
        Value::Object(map) => map.into_iter().collect(),
        other => {
            tracing::warn!(?other, "workflow variables are not an object; ignoring");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph(blocks: Value) -> WorkflowGraph {
        serde_json::from_value(json!({"blocks": blocks, "edges": [], "loops": {}})).unwrap()
    }

    #[test]
    fn test_resolve_block_states_copies_values() {
        let g = graph(json!({
            "b1": {"id": "b1", "type": "agent", "subBlocks": {
                "prompt": {"id": "prompt", "value": "hello"},
                "unset": {"id": "unset"}
            }}
        }));

        let states = resolve_block_states(&g);
        assert_eq!(states["b1"]["prompt"], json!("hello"));
        assert_eq!(states["b1"]["unset"], Value::Null);
    }

    #[test]
    fn test_response_format_string_is_reparsed() {
        let g = graph(json!({
            "b1": {"id": "b1", "type": "agent", "subBlocks": {
                "responseFormat": {"id": "responseFormat",
                    "value": "{\"name\":\"out\",\"schema\":{\"type\":\"object\"}}"}
            }}
        }));

        let states = resolve_block_states(&g);
        assert_eq!(states["b1"]["responseFormat"]["name"], "out");
    }

    #[test]
    fn test_bare_schema_gets_wrapped() {
        let normalized =
            normalize_response_format(&json!({"type": "object", "properties": {}})).unwrap();
        assert_eq!(normalized["name"], "response_format");
        assert_eq!(normalized["strict"], true);
        assert_eq!(normalized["schema"]["type"], "object");
    }

    #[test]
    fn test_enveloped_schema_passes_through() {
        let enveloped = json!({"name": "custom", "schema": {"type": "object"}, "strict": false});
        assert_eq!(normalize_response_format(&enveloped).unwrap(), enveloped);
    }

    #[test]
    fn test_empty_string_becomes_null() {
        assert_eq!(normalize_response_format(&json!("  ")).unwrap(), Value::Null);
    }

    #[test]
    fn test_invalid_string_keeps_raw_value() {
        let g = graph(json!({
            "b1": {"id": "b1", "type": "agent", "subBlocks": {
                "responseFormat": {"id": "responseFormat", "value": "{not json"}
            }}
        }));

        // Non-fatal: the raw string survives
        let states = resolve_block_states(&g);
        assert_eq!(states["b1"]["responseFormat"], json!("{not json"));
    }

    #[test]
    fn test_parse_variables_from_string() {
        let raw = json!("{\"region\": \"eu\"}");
        let vars = parse_variables(Some(&raw));
        assert_eq!(vars["region"], json!("eu"));
    }

    #[test]
    fn test_parse_variables_from_object() {
        let raw = json!({"region": "us"});
        let vars = parse_variables(Some(&raw));
        assert_eq!(vars["region"], json!("us"));
    }

    #[test]
    fn test_parse_variables_tolerates_garbage() {
        assert!(parse_variables(Some(&json!("{broken"))).is_empty());
        assert!(parse_variables(Some(&json!(42))).is_empty());
        assert!(parse_variables(None).is_empty());
    }
}
