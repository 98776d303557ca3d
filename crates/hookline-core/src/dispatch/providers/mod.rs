//! Provider-specific request validation and input shaping.
//!
//! Each adapter owns one provider's quirks: Slack's signed requests and
//! url_verification handshake, WhatsApp's message envelope, Airtable's
//! ping-then-poll reconciliation, and the token/IP checks shared by the
//! generic-style providers.

pub mod airtable;
pub mod generic;
pub mod slack;
pub mod whatsapp;

use hookline_types::webhook::{HeaderSnapshot, WebhookRegistration};
use serde_json::{Value, json};

/// The common trigger input shape shared by Slack and the generic-style
/// providers (and embedded alongside the WhatsApp-specific shape).
pub fn webhook_input(
    registration: &WebhookRegistration,
    payload: &Value,
    headers: &HeaderSnapshot,
    method: &str,
) -> Value {
    json!({
        "webhook": {
            "data": {
                "path": registration.path,
                "provider": registration.provider.as_str(),
                "providerConfig": registration.provider_config,
                "payload": payload,
                "headers": headers,
                "method": method,
            }
        },
        "workflowId": registration.workflow_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hookline_types::webhook::WebhookProvider;
    use std::collections::HashMap;
    use uuid::Uuid;

    #[test]
    fn test_webhook_input_shape() {
        let reg = WebhookRegistration {
            id: Uuid::now_v7(),
            workflow_id: Uuid::now_v7(),
            path: "orders".to_string(),
            provider: WebhookProvider::Generic,
            provider_config: json!({"requireAuth": false}),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let headers = HashMap::from([("content-type".to_string(), "application/json".to_string())]);

        let input = webhook_input(&reg, &json!({"k": 1}), &headers, "POST");

        assert_eq!(input["webhook"]["data"]["path"], "orders");
        assert_eq!(input["webhook"]["data"]["provider"], "generic");
        assert_eq!(input["webhook"]["data"]["payload"]["k"], 1);
        assert_eq!(input["webhook"]["data"]["method"], "POST");
        assert_eq!(
            input["workflowId"],
            json!(reg.workflow_id)
        );
    }
}
