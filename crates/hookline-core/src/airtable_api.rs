//! Airtable payloads API trait.
//!
//! A trait seam over the paginated payloads endpoint so the polling loop is
//! testable without HTTP. The infra layer provides the reqwest-backed
//! implementation.

use hookline_types::airtable::PayloadsPage;
use hookline_types::error::AirtableError;

/// The paginated webhook-payloads pull API.
pub trait AirtablePayloadsApi: Send + Sync {
    /// Fetch one page of payloads. `cursor == None` starts from Airtable's
    /// default position.
    fn list_payloads(
        &self,
        base_id: &str,
        webhook_id: &str,
        cursor: Option<i64>,
        access_token: &str,
    ) -> impl std::future::Future<Output = Result<PayloadsPage, AirtableError>> + Send;
}
