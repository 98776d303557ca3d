//! Airtable payloads API types and the consolidated change record.
//!
//! Airtable webhooks deliver only a ping; actual record changes are pulled
//! from the paginated payloads endpoint. Wire structs mirror the API's
//! camelCase JSON. `AirtableChange` is the net-change record handed to the
//! execution engine after consolidation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a consolidated change started life as a record creation or edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirtableChangeType {
    Created,
    Updated,
}

/// One net change for a record within a polling burst.
///
/// Multiple raw edits to the same record collapse into one of these:
/// first-observed `previous_fields`, latest `changed_fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtableChange {
    pub table_id: String,
    pub record_id: String,
    pub change_type: AirtableChangeType,
    pub changed_fields: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_fields: Option<HashMap<String, Value>>,
}

// ---------------------------------------------------------------------------
// Payloads endpoint wire types
// ---------------------------------------------------------------------------

/// One page of the payloads endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayloadsPage {
    pub cursor: Option<i64>,
    pub might_have_more: bool,
    pub payloads: Vec<PingPayload>,
}

/// One webhook payload within a page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PingPayload {
    pub changed_tables_by_id: HashMap<String, TableChanges>,
}

/// Changes within one table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableChanges {
    pub created_records_by_id: HashMap<String, CreatedRecord>,
    pub changed_records_by_id: HashMap<String, ChangedRecord>,
}

/// A newly created record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatedRecord {
    pub cell_values_by_field_id: HashMap<String, Value>,
}

/// An edited record with current and (optionally) previous cell values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangedRecord {
    pub current: CellValues,
    pub previous: Option<CellValues>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellValues {
    pub cell_values_by_field_id: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payloads_page_parses_api_shape() {
        let page: PayloadsPage = serde_json::from_value(json!({
            "cursor": 3,
            "mightHaveMore": true,
            "payloads": [{
                "changedTablesById": {
                    "tbl1": {
                        "createdRecordsById": {
                            "rec1": {"cellValuesByFieldId": {"fld1": "a"}}
                        },
                        "changedRecordsById": {
                            "rec2": {
                                "current": {"cellValuesByFieldId": {"fld1": "new"}},
                                "previous": {"cellValuesByFieldId": {"fld1": "old"}}
                            }
                        }
                    }
                }
            }]
        }))
        .unwrap();

        assert_eq!(page.cursor, Some(3));
        assert!(page.might_have_more);
        let table = &page.payloads[0].changed_tables_by_id["tbl1"];
        assert_eq!(
            table.created_records_by_id["rec1"].cell_values_by_field_id["fld1"],
            json!("a")
        );
        assert_eq!(
            table.changed_records_by_id["rec2"]
                .previous
                .as_ref()
                .unwrap()
                .cell_values_by_field_id["fld1"],
            json!("old")
        );
    }

    #[test]
    fn test_empty_page_defaults() {
        let page: PayloadsPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.cursor.is_none());
        assert!(!page.might_have_more);
        assert!(page.payloads.is_empty());
    }

    #[test]
    fn test_change_serializes_camel_case() {
        let change = AirtableChange {
            table_id: "tbl1".to_string(),
            record_id: "rec1".to_string(),
            change_type: AirtableChangeType::Created,
            changed_fields: HashMap::from([("fld1".to_string(), json!(1))]),
            previous_fields: None,
        };
        let v = serde_json::to_value(&change).unwrap();
        assert_eq!(v["changeType"], "created");
        assert_eq!(v["changedFields"]["fld1"], 1);
        assert!(v.get("previousFields").is_none());
    }
}
