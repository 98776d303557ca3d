//! Webhook registration types.
//!
//! A `WebhookRegistration` maps an inbound URL path to a provider and a
//! parent workflow. Its `provider_config` is an opaque JSON bag written by
//! the configuration surface; the dispatcher reads it through the typed
//! views in this module and mutates only the Airtable polling state
//! (`externalWebhookCursor`, `processedNotifications`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Maximum number of processed Airtable notification keys retained per
/// registration. Oldest keys are dropped first.
pub const PROCESSED_NOTIFICATIONS_CAP: usize = 100;

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// The third-party platform a registration accepts deliveries from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookProvider {
    Slack,
    Whatsapp,
    Airtable,
    Github,
    Stripe,
    Generic,
    Other,
}

impl WebhookProvider {
    /// Stable lowercase name, matching the stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookProvider::Slack => "slack",
            WebhookProvider::Whatsapp => "whatsapp",
            WebhookProvider::Airtable => "airtable",
            WebhookProvider::Github => "github",
            WebhookProvider::Stripe => "stripe",
            WebhookProvider::Generic => "generic",
            WebhookProvider::Other => "other",
        }
    }

    /// Parse from the stored column value.
    pub fn parse(s: &str) -> Option<Self> {
        serde_json::from_value(Value::String(s.to_string())).ok()
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// A persisted inbound webhook endpoint.
///
/// Invariant: at most one *active* registration resolves a given path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRegistration {
    /// UUIDv7 assigned on creation.
    pub id: Uuid,
    /// The workflow this endpoint triggers.
    pub workflow_id: Uuid,
    /// URL path segment used as the routing key.
    pub path: String,
    /// Which provider's deliveries this endpoint accepts.
    pub provider: WebhookProvider,
    /// Opaque provider-specific settings plus Airtable polling state.
    pub provider_config: Value,
    /// Inactive registrations never resolve.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Typed config views
// ---------------------------------------------------------------------------

/// Slack request-signing settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackSigningConfig {
    pub signing_secret: Option<String>,
}

/// Provider handshake settings (WhatsApp / Meta verification).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationConfig {
    pub verification_token: Option<String>,
}

/// Token / IP auth settings for generic-style providers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InboundAuthConfig {
    pub require_auth: bool,
    pub token: Option<String>,
    pub secret_header_name: Option<String>,
    pub allowed_ips: Vec<String>,
}

/// Durable Airtable settings (never mutated by the dispatcher).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AirtableSettings {
    pub base_id: Option<String>,
    pub external_webhook_id: Option<String>,
}

impl SlackSigningConfig {
    pub fn from_config(config: &Value) -> Self {
        serde_json::from_value(config.clone()).unwrap_or_default()
    }
}

impl VerificationConfig {
    pub fn from_config(config: &Value) -> Self {
        serde_json::from_value(config.clone()).unwrap_or_default()
    }
}

impl InboundAuthConfig {
    pub fn from_config(config: &Value) -> Self {
        serde_json::from_value(config.clone()).unwrap_or_default()
    }
}

impl AirtableSettings {
    pub fn from_config(config: &Value) -> Self {
        serde_json::from_value(config.clone()).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Airtable polling state
// ---------------------------------------------------------------------------

/// The persisted polling cursor, distinguishing an absent field from an
/// explicit null. An absent field is repaired to null on first sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorField {
    /// Key not present in the config at all.
    Missing,
    /// Key present with a null value (poll from Airtable's default).
    Null,
    /// A previously persisted numeric cursor.
    Present(i64),
}

impl CursorField {
    pub fn value(&self) -> Option<i64> {
        match self {
            CursorField::Present(v) => Some(*v),
            _ => None,
        }
    }
}

/// Mutable polling state carried inside `provider_config`, kept separate
/// from the durable settings so the dispatcher only ever rewrites its own
/// two keys.
#[derive(Debug, Clone)]
pub struct AirtablePollingState {
    pub cursor: CursorField,
    pub processed_notifications: Vec<String>,
}

impl AirtablePollingState {
    const CURSOR_KEY: &'static str = "externalWebhookCursor";
    const NOTIFICATIONS_KEY: &'static str = "processedNotifications";

    /// Read the polling state out of a `provider_config` bag.
    pub fn from_config(config: &Value) -> Self {
        let cursor = match config.get(Self::CURSOR_KEY) {
            None => CursorField::Missing,
            Some(Value::Null) => CursorField::Null,
            Some(v) => v.as_i64().map(CursorField::Present).unwrap_or(CursorField::Null),
        };

        let processed_notifications = config
            .get(Self::NOTIFICATIONS_KEY)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cursor,
            processed_notifications,
        }
    }

    /// Record a notification key. Returns `false` when the key was already
    /// present (a duplicate ping). The ring is capped; oldest keys drop off.
    pub fn record_notification(&mut self, key: &str) -> bool {
        if self.processed_notifications.iter().any(|k| k == key) {
            return false;
        }
        self.processed_notifications.push(key.to_string());
        if self.processed_notifications.len() > PROCESSED_NOTIFICATIONS_CAP {
            let overflow = self.processed_notifications.len() - PROCESSED_NOTIFICATIONS_CAP;
            self.processed_notifications.drain(..overflow);
        }
        true
    }

    /// Advance the cursor to a newly returned value.
    pub fn set_cursor(&mut self, cursor: i64) {
        self.cursor = CursorField::Present(cursor);
    }

    /// Write the polling state back into a `provider_config` bag, leaving
    /// every other key untouched. A `Missing` cursor is written as null
    /// (the repair step).
    pub fn write_into(&self, config: &mut Value) {
        if !config.is_object() {
            *config = Value::Object(serde_json::Map::new());
        }
        if let Some(obj) = config.as_object_mut() {
            let cursor_value = match self.cursor {
                CursorField::Present(v) => Value::from(v),
                CursorField::Null | CursorField::Missing => Value::Null,
            };
            obj.insert(Self::CURSOR_KEY.to_string(), cursor_value);
            obj.insert(
                Self::NOTIFICATIONS_KEY.to_string(),
                Value::Array(
                    self.processed_notifications
                        .iter()
                        .map(|k| Value::String(k.clone()))
                        .collect(),
                ),
            );
        }
    }
}

/// Convenience map alias used by the input-shaping code.
pub type HeaderSnapshot = HashMap<String, String>;
