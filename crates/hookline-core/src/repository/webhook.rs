//! Webhook registration repository trait.
//!
//! The dispatcher is read-only against registrations except for the
//! Airtable polling state inside `provider_config`, which is rewritten as a
//! whole object to avoid partial-write inconsistency in a stateless
//! execution environment.
//!
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use hookline_types::error::RepositoryError;
use hookline_types::webhook::{WebhookProvider, WebhookRegistration};
use uuid::Uuid;

/// Repository trait for webhook registrations.
pub trait WebhookRepository: Send + Sync {
    /// Resolve the single active registration for a path, if any.
    fn find_active_by_path(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Option<WebhookRegistration>, RepositoryError>> + Send;

    /// List all active registrations for a provider (handshake token search).
    fn find_active_by_provider(
        &self,
        provider: WebhookProvider,
    ) -> impl std::future::Future<Output = Result<Vec<WebhookRegistration>, RepositoryError>> + Send;

    /// Replace the full `provider_config` object for a registration.
    fn update_provider_config(
        &self,
        id: &Uuid,
        config: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
