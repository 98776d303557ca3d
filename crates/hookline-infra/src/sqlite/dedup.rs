//! SQLite deduplication store.
//!
//! Keys expire by TTL rather than explicit deletion. Expiry is lazy: a key
//! past its `expires_at` reads as unprocessed and is removed on sight. A
//! periodic `purge_expired` sweep keeps the table from growing unbounded
//! between reads.

use std::time::Duration;

use hookline_core::storage::dedup_store::DedupStore;
use hookline_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `DedupStore`.
pub struct SqliteDedupStore {
    pool: DatabasePool,
}

impl SqliteDedupStore {
    /// Create a new dedup store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Delete all expired keys. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM processed_webhook_keys WHERE expires_at < ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        if result.rows_affected() > 0 {
            tracing::debug!(purged = result.rows_affected(), "expired dedup keys removed");
        }
        Ok(result.rows_affected())
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

impl DedupStore for SqliteDedupStore {
    async fn has_processed(&self, key: &str) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT expires_at FROM processed_webhook_keys WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(false);
        };

        let expires_at: String = row
            .try_get("expires_at")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let expires_at = parse_datetime(&expires_at)?;

        if expires_at < Utc::now() {
            // Lazy expiry
            sqlx::query("DELETE FROM processed_webhook_keys WHERE key = ?")
                .bind(key)
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            return Ok(false);
        }

        Ok(true)
    }

    async fn mark_processed(&self, key: &str, ttl: Duration) -> Result<(), RepositoryError> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| RepositoryError::Query(format!("invalid TTL: {e}")))?;

        sqlx::query(
            r#"INSERT INTO processed_webhook_keys (key, expires_at)
               VALUES (?, ?)
               ON CONFLICT(key) DO UPDATE SET expires_at = excluded.expires_at"#,
        )
        .bind(key)
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}
