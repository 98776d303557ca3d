//! WhatsApp (Meta Cloud API) payload shaping.
//!
//! Message deliveries arrive as `entry[0].changes[0].value.messages`; an
//! empty list is a status callback that gets acknowledged without
//! executing anything.

use serde_json::{Value, json};

/// The first message extracted from a WhatsApp delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WhatsAppMessage {
    pub message_id: String,
    pub from: Option<String>,
    pub phone_number_id: Option<String>,
    pub text: Option<String>,
    pub timestamp: Option<String>,
    pub raw: Value,
}

/// Pull the first message out of a delivery body, if any.
pub fn first_message(body: &Value) -> Option<WhatsAppMessage> {
    let value = body
        .get("entry")?
        .get(0)?
        .get("changes")?
        .get(0)?
        .get("value")?;

    let message = value.get("messages")?.get(0)?;
    let message_id = message.get("id")?.as_str()?.to_string();

    let phone_number_id = value
        .get("metadata")
        .and_then(|m| m.get("phone_number_id"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(WhatsAppMessage {
        message_id,
        from: message.get("from").and_then(Value::as_str).map(str::to_string),
        phone_number_id,
        text: message
            .get("text")
            .and_then(|t| t.get("body"))
            .and_then(Value::as_str)
            .map(str::to_string),
        timestamp: message
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string),
        raw: message.clone(),
    })
}

/// The WhatsApp-specific half of the trigger input.
pub fn message_input(message: &WhatsAppMessage) -> Value {
    json!({
        "data": {
            "messageId": message.message_id,
            "from": message.from,
            "phoneNumberId": message.phone_number_id,
            "text": message.text,
            "timestamp": message.timestamp,
            "raw": message.raw,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delivery(messages: Value) -> Value {
        json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "metadata": {"phone_number_id": "555123"},
                        "messages": messages
                    }
                }]
            }]
        })
    }

    #[test]
    fn test_first_message_extracted() {
        let body = delivery(json!([{
            "id": "wamid.1",
            "from": "15551234567",
            "timestamp": "1700000000",
            "text": {"body": "hello"}
        }]));

        let msg = first_message(&body).unwrap();
        assert_eq!(msg.message_id, "wamid.1");
        assert_eq!(msg.from.as_deref(), Some("15551234567"));
        assert_eq!(msg.phone_number_id.as_deref(), Some("555123"));
        assert_eq!(msg.text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_empty_messages_is_status_callback() {
        let body = delivery(json!([]));
        assert!(first_message(&body).is_none());
    }

    #[test]
    fn test_missing_envelope_yields_none() {
        assert!(first_message(&json!({})).is_none());
        assert!(first_message(&json!({"entry": []})).is_none());
    }

    #[test]
    fn test_message_input_shape() {
        let msg = WhatsAppMessage {
            message_id: "wamid.1".to_string(),
            from: Some("1555".to_string()),
            phone_number_id: Some("42".to_string()),
            text: Some("hi".to_string()),
            timestamp: Some("1700000000".to_string()),
            raw: json!({"id": "wamid.1"}),
        };
        let input = message_input(&msg);
        assert_eq!(input["data"]["messageId"], "wamid.1");
        assert_eq!(input["data"]["raw"]["id"], "wamid.1");
    }
}
