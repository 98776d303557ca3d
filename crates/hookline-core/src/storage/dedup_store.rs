//! Deduplication store trait.
//!
//! Tracks recently-seen delivery keys (content hashes or transport message
//! ids) with a bounded TTL. Entries expire automatically; there is no
//! explicit deletion. Store failures are treated as non-fatal by callers --
//! over-processing is preferred over silently dropping events.

use std::time::Duration;

use hookline_types::error::RepositoryError;

/// Default TTL applied when a caller does not specify one.
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(60 * 60);

/// Existence-with-TTL store for delivery dedup keys.
pub trait DedupStore: Send + Sync {
    /// Has this key been marked within its TTL window?
    fn has_processed(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Mark a key processed for `ttl`.
    fn mark_processed(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
