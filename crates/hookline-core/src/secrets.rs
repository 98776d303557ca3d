//! Secret resolution trait.
//!
//! Covers the two secret concerns the dispatcher has: decrypted per-user
//! environment variables for an execution, and OAuth access tokens for
//! provider API polling. Decryption failure for any single variable must
//! surface as an error -- partial environments are not tolerated.

use std::collections::HashMap;

use hookline_types::error::SecretError;
use uuid::Uuid;

/// Per-user secret resolution.
pub trait SecretStore: Send + Sync {
    /// Fetch and decrypt every environment variable owned by `user_id`.
    ///
    /// Fails if any single value cannot be decrypted.
    fn decrypted_env(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<HashMap<String, String>, SecretError>> + Send;

    /// Look up an OAuth access token for `user_id` and a provider name.
    fn access_token(
        &self,
        user_id: &Uuid,
        provider: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, SecretError>> + Send;
}
