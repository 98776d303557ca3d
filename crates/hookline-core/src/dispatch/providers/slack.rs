//! Slack request validation and payload classification.
//!
//! Slack signs requests with `v0=HMAC-SHA256(secret, "v0:{ts}:{body}")` in
//! the `x-slack-signature` header. Verification is constant-time via the
//! hmac crate's `verify_slice`.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
/// Header carrying the signing timestamp.
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// A classified Slack delivery body.
#[derive(Debug, Clone, PartialEq)]
pub enum SlackPayload {
    /// Slack's own handshake; the challenge must be echoed back verbatim.
    UrlVerification { challenge: String },
    /// An event callback, with its transport-native event id when present.
    Event { event_id: Option<String> },
}

/// Classify a parsed Slack body.
pub fn classify(body: &Value) -> SlackPayload {
    if body.get("type").and_then(Value::as_str) == Some("url_verification") {
        if let Some(challenge) = body.get("challenge").and_then(Value::as_str) {
            return SlackPayload::UrlVerification {
                challenge: challenge.to_string(),
            };
        }
    }

    let event_id = body
        .get("event")
        .and_then(|e| e.get("event_id"))
        .or_else(|| body.get("event_id"))
        .and_then(Value::as_str)
        .map(str::to_string);

    SlackPayload::Event { event_id }
}

/// Verify a Slack request signature against the raw body.
///
/// `signature` is the full header value (`v0=<hex>`).
pub fn verify_signature(signing_secret: &str, timestamp: &str, body: &str, signature: &str) -> bool {
    let Some(hex_sig) = signature.strip_prefix("v0=") else {
        return false;
    };
    let Ok(expected) = hex_decode(hex_sig) else {
        return false;
    };

    let base = format!("v0:{timestamp}:{body}");
    let Ok(mut mac) = HmacSha256::new_from_slice(signing_secret.as_bytes()) else {
        return false;
    };
    mac.update(base.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Compute a valid signature header value. Used to generate test vectors.
pub fn sign(signing_secret: &str, timestamp: &str, body: &str) -> String {
    let base = format!("v0:{timestamp}:{body}");
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(base.as_bytes());
    let digest = mac.finalize().into_bytes();
    format!("v0={}", hex_encode(&digest))
}

fn hex_decode(hex: &str) -> Result<Vec<u8>, ()> {
    if hex.len() % 2 != 0 {
        return Err(());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
