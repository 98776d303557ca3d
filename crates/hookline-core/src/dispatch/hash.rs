//! Content-derived deduplication hashing.
//!
//! Retried deliveries of the same logical event may carry fresh timestamps,
//! nonces, or event ids, so the dedup key is computed over a normalized copy
//! of the body with volatile fields stripped recursively. The path is mixed
//! into the hash so identical bodies on different endpoints stay distinct.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Field names whose values change across retried deliveries of the same
/// logical event.
const VOLATILE_KEYS: &[&str] = &[
    "timestamp",
    "ts",
    "nonce",
    "event_id",
    "eventId",
    "event_time",
    "eventTime",
    "request_id",
    "requestId",
    "message_id",
    "messageId",
    "delivery_id",
    "deliveryId",
];

/// Strip volatile fields recursively through nested objects and arrays.
pub fn normalize_body(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !VOLATILE_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), normalize_body(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize_body).collect()),
        other => other.clone(),
    }
}

/// Compute the content-derived dedup key for a delivery.
///
/// Object keys serialize in sorted order, so the same logical content always
/// hashes identically regardless of field ordering on the wire.
pub fn content_dedup_key(path: &str, body: &Value) -> String {
    let normalized = normalize_body(body);
    let canonical = serde_json::to_string(&normalized).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(b":");
    hasher.update(canonical.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_is_stable_for_identical_input() {
        let body = json!({"event": {"text": "hi"}, "team": "T1"});
        assert_eq!(
            content_dedup_key("hooks/a", &body),
            content_dedup_key("hooks/a", &body)
        );
    }

    #[test]
    fn test_volatile_fields_do_not_affect_hash() {
        let b1 = json!({"event": {"text": "hi", "timestamp": 1}, "nonce": "x"});
        let b2 = json!({"event": {"text": "hi", "timestamp": 2}, "nonce": "y"});
        assert_eq!(
            content_dedup_key("hooks/a", &b1),
            content_dedup_key("hooks/a", &b2)
        );
    }

    #[test]
    fn test_volatile_fields_stripped_inside_arrays() {
        let b1 = json!({"items": [{"v": 1, "event_id": "e1"}]});
        let b2 = json!({"items": [{"v": 1, "event_id": "e2"}]});
        assert_eq!(
            content_dedup_key("hooks/a", &b1),
            content_dedup_key("hooks/a", &b2)
        );
    }

    #[test]
    fn test_different_content_hashes_differently() {
        let b1 = json!({"event": "a"});
        let b2 = json!({"event": "b"});
        assert_ne!(
            content_dedup_key("hooks/a", &b1),
            content_dedup_key("hooks/a", &b2)
        );
    }

    #[test]
    fn test_path_is_part_of_the_key() {
        let body = json!({"event": "a"});
        assert_ne!(
            content_dedup_key("hooks/a", &body),
            content_dedup_key("hooks/b", &body)
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let body = json!({"a": {"timestamp": 1, "b": [{"nonce": "x", "k": 2}]}});
        let once = normalize_body(&body);
        let twice = normalize_body(&once);
        assert_eq!(once, twice);
    }
}
