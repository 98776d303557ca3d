//! Airtable ping parsing and change consolidation.
//!
//! One polling burst may observe the same record several times across
//! pages. The consolidator collapses those into one net change per record:
//! `previous_fields` from the first observed update only, `changed_fields`
//! from the latest observation, and a create-then-update stays `created`.

use std::collections::HashMap;

use hookline_types::airtable::{AirtableChange, AirtableChangeType, PingPayload};
use serde_json::Value;

/// Identity extracted from an inbound Airtable ping body.
#[derive(Debug, Clone, PartialEq)]
pub struct PingIdentity {
    /// `webhook.id` from the ping, falling back to the registration's
    /// stored external webhook id.
    pub webhook_id: String,
    /// Airtable's notification id (the ping timestamp when absent).
    pub notification_id: Option<String>,
}

impl PingIdentity {
    pub fn from_body(body: &Value, fallback_webhook_id: Option<&str>) -> Option<Self> {
        let webhook_id = body
            .get("webhook")
            .and_then(|w| w.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| fallback_webhook_id.map(str::to_string))?;

        let notification_id = body
            .get("notificationId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                body.get("timestamp")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });

        Some(Self {
            webhook_id,
            notification_id,
        })
    }

    /// The per-registration dedup key for this ping, when derivable.
    pub fn dedup_key(&self) -> Option<String> {
        self.notification_id
            .as_ref()
            .map(|n| format!("{}_{}", self.webhook_id, n))
    }
}

/// Accumulates net changes across polling pages, keyed by record.
#[derive(Debug, Default)]
pub struct ChangeConsolidator {
    changes: HashMap<(String, String), AirtableChange>,
    order: Vec<(String, String)>,
}

impl ChangeConsolidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one payload's `changedTablesById` into the batch.
    pub fn absorb(&mut self, payload: &PingPayload) {
        for (table_id, table) in &payload.changed_tables_by_id {
            for (record_id, created) in &table.created_records_by_id {
                self.record_created(
                    table_id,
                    record_id,
                    created.cell_values_by_field_id.clone(),
                );
            }
            for (record_id, changed) in &table.changed_records_by_id {
                self.record_updated(
                    table_id,
                    record_id,
                    changed.current.cell_values_by_field_id.clone(),
                    changed
                        .previous
                        .as_ref()
                        .map(|p| p.cell_values_by_field_id.clone()),
                );
            }
        }
    }

    fn record_created(
        &mut self,
        table_id: &str,
        record_id: &str,
        fields: HashMap<String, Value>,
    ) {
        let key = (table_id.to_string(), record_id.to_string());
        match self.changes.get_mut(&key) {
            Some(existing) => {
                existing.changed_fields.extend(fields);
            }
            None => {
                self.order.push(key.clone());
                self.changes.insert(
                    key,
                    AirtableChange {
                        table_id: table_id.to_string(),
                        record_id: record_id.to_string(),
                        change_type: AirtableChangeType::Created,
                        changed_fields: fields,
                        previous_fields: None,
                    },
                );
            }
        }
    }

    fn record_updated(
        &mut self,
        table_id: &str,
        record_id: &str,
        current: HashMap<String, Value>,
        previous: Option<HashMap<String, Value>>,
    ) {
        let key = (table_id.to_string(), record_id.to_string());
        match self.changes.get_mut(&key) {
            Some(existing) => {
                // Later edits merge in without touching previous_fields or
                // flipping a created entry to updated.
                existing.changed_fields.extend(current);
            }
            None => {
                self.order.push(key.clone());
                self.changes.insert(
                    key,
                    AirtableChange {
                        table_id: table_id.to_string(),
                        record_id: record_id.to_string(),
                        change_type: AirtableChangeType::Updated,
                        changed_fields: current,
                        previous_fields: previous,
                    },
                );
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Drain in first-observed order.
    pub fn into_changes(mut self) -> Vec<AirtableChange> {
        self.order
            .iter()
            .filter_map(|key| self.changes.remove(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_with(changed_tables: Value) -> PingPayload {
        serde_json::from_value(json!({"changedTablesById": changed_tables})).unwrap()
    }

    #[test]
    fn test_ping_identity_prefers_body_webhook_id() {
        let body = json!({"webhook": {"id": "whX"}, "notificationId": "n1"});
        let id = PingIdentity::from_body(&body, Some("whFallback")).unwrap();
        assert_eq!(id.webhook_id, "whX");
        assert_eq!(id.dedup_key().unwrap(), "whX_n1");
    }

    #[test]
    fn test_ping_identity_timestamp_fallback() {
        let body = json!({"timestamp": "2026-01-01T00:00:00.000Z"});
        let id = PingIdentity::from_body(&body, Some("whY")).unwrap();
        assert_eq!(id.webhook_id, "whY");
        assert_eq!(id.dedup_key().unwrap(), "whY_2026-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_ping_identity_missing_everything() {
        assert!(PingIdentity::from_body(&json!({}), None).is_none());
        let id = PingIdentity::from_body(&json!({}), Some("wh")).unwrap();
        assert!(id.dedup_key().is_none());
    }

    #[test]
    fn test_create_then_update_stays_created() {
        let mut consolidator = ChangeConsolidator::new();

        consolidator.absorb(&page_with(json!({
            "tbl1": {"createdRecordsById": {"recR": {"cellValuesByFieldId": {"a": 1}}}}
        })));
        consolidator.absorb(&page_with(json!({
            "tbl1": {"changedRecordsById": {"recR": {
                "current": {"cellValuesByFieldId": {"a": 2, "b": 3}},
                "previous": {"cellValuesByFieldId": {"a": 1}}
            }}}
        })));

        let changes = consolidator.into_changes();
        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.change_type, AirtableChangeType::Created);
        assert_eq!(change.changed_fields["a"], json!(2));
        assert_eq!(change.changed_fields["b"], json!(3));
        assert!(change.previous_fields.is_none());
    }

    #[test]
    fn test_repeated_updates_keep_first_previous() {
        let mut consolidator = ChangeConsolidator::new();

        consolidator.absorb(&page_with(json!({
            "tbl1": {"changedRecordsById": {"recR": {
                "current": {"cellValuesByFieldId": {"a": 2}},
                "previous": {"cellValuesByFieldId": {"a": 1}}
            }}}
        })));
        consolidator.absorb(&page_with(json!({
            "tbl1": {"changedRecordsById": {"recR": {
                "current": {"cellValuesByFieldId": {"a": 3}},
                "previous": {"cellValuesByFieldId": {"a": 2}}
            }}}
        })));

        let changes = consolidator.into_changes();
        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.change_type, AirtableChangeType::Updated);
        assert_eq!(change.previous_fields.as_ref().unwrap()["a"], json!(1));
        assert_eq!(change.changed_fields["a"], json!(3));
    }

    #[test]
    fn test_records_in_different_tables_stay_separate() {
        let mut consolidator = ChangeConsolidator::new();

        consolidator.absorb(&page_with(json!({
            "tbl1": {"createdRecordsById": {"recR": {"cellValuesByFieldId": {"a": 1}}}},
            "tbl2": {"createdRecordsById": {"recR": {"cellValuesByFieldId": {"b": 2}}}}
        })));

        assert_eq!(consolidator.into_changes().len(), 2);
    }

    #[test]
    fn test_empty_consolidator() {
        let consolidator = ChangeConsolidator::new();
        assert!(consolidator.is_empty());
        assert!(consolidator.into_changes().is_empty());
    }
}
