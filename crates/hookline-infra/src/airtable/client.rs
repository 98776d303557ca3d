//! Reqwest-backed Airtable payloads client.
//!
//! Implements `AirtablePayloadsApi` against the webhook payloads endpoint
//! (`/v0/bases/{baseId}/webhooks/{webhookId}/payloads`). Responses are
//! decoded straight into the wire types; non-2xx statuses surface as
//! `AirtableError::Api` with the response body as the message.

use std::time::Duration;

use hookline_core::airtable_api::AirtablePayloadsApi;
use hookline_types::airtable::PayloadsPage;
use hookline_types::error::AirtableError;

/// Page size requested per payloads call.
const PAGE_LIMIT: u32 = 50;

/// Airtable payloads API over HTTP.
pub struct HttpAirtablePayloadsApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAirtablePayloadsApi {
    /// Create a new client against the production Airtable API.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: "https://api.airtable.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn payloads_url(&self, base_id: &str, webhook_id: &str, cursor: Option<i64>) -> String {
        let mut url = format!(
            "{}/v0/bases/{base_id}/webhooks/{webhook_id}/payloads?limit={PAGE_LIMIT}",
            self.base_url
        );
        if let Some(cursor) = cursor {
            url.push_str(&format!("&cursor={cursor}"));
        }
        url
    }
}

impl Default for HttpAirtablePayloadsApi {
    fn default() -> Self {
        Self::new()
    }
}

impl AirtablePayloadsApi for HttpAirtablePayloadsApi {
    async fn list_payloads(
        &self,
        base_id: &str,
        webhook_id: &str,
        cursor: Option<i64>,
        access_token: &str,
    ) -> Result<PayloadsPage, AirtableError> {
        let url = self.payloads_url(base_id, webhook_id, cursor);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AirtableError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AirtableError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<PayloadsPage>()
            .await
            .map_err(|e| AirtableError::Decode(e.to_string()))
    }
}
