//! SQLite webhook registration repository.
//!
//! Implements `WebhookRepository` from `hookline-core` using sqlx with
//! split read/write pools. `provider_config` is stored as a JSON blob and
//! only ever replaced as a whole object.

use hookline_core::repository::webhook::WebhookRepository;
use hookline_types::error::RepositoryError;
use hookline_types::webhook::{WebhookProvider, WebhookRegistration};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WebhookRepository`.
pub struct SqliteWebhookRepository {
    pool: DatabasePool,
}

impl SqliteWebhookRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct WebhookRow {
    id: String,
    workflow_id: String,
    path: String,
    provider: String,
    provider_config: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl WebhookRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            path: row.try_get("path")?,
            provider: row.try_get("provider")?,
            provider_config: row.try_get("provider_config")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_registration(self) -> Result<WebhookRegistration, RepositoryError> {
        let provider = WebhookProvider::parse(&self.provider)
            .ok_or_else(|| RepositoryError::Query(format!("invalid provider: {}", self.provider)))?;

        let provider_config: serde_json::Value = serde_json::from_str(&self.provider_config)
            .map_err(|e| RepositoryError::Query(format!("invalid provider_config JSON: {e}")))?;

        Ok(WebhookRegistration {
            id: parse_uuid(&self.id)?,
            workflow_id: parse_uuid(&self.workflow_id)?,
            path: self.path,
            provider,
            provider_config,
            is_active: self.is_active,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

// ---------------------------------------------------------------------------
// WebhookRepository impl
// ---------------------------------------------------------------------------

impl WebhookRepository for SqliteWebhookRepository {
    async fn find_active_by_path(
        &self,
        path: &str,
    ) -> Result<Option<WebhookRegistration>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM webhooks WHERE path = ? AND is_active = 1")
            .bind(path)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = WebhookRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_registration()?))
            }
            None => Ok(None),
        }
    }

    async fn find_active_by_provider(
        &self,
        provider: WebhookProvider,
    ) -> Result<Vec<WebhookRegistration>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM webhooks WHERE provider = ? AND is_active = 1 ORDER BY created_at ASC",
        )
        .bind(provider.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut registrations = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = WebhookRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            registrations.push(r.into_registration()?);
        }
        Ok(registrations)
    }

    async fn update_provider_config(
        &self,
        id: &Uuid,
        config: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let config_json = serde_json::to_string(config)
            .map_err(|e| RepositoryError::Query(format!("serialize provider_config: {e}")))?;

        let result = sqlx::query("UPDATE webhooks SET provider_config = ?, updated_at = ? WHERE id = ?")
            .bind(&config_json)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
