//! SQLite workflow repository.
//!
//! Implements `WorkflowRepository` from `hookline-core`. The graph and
//! variables columns are JSON blobs; counters live in dedicated columns so
//! bumps never rewrite the graph.

use hookline_core::repository::workflow::WorkflowRepository;
use hookline_types::error::RepositoryError;
use hookline_types::workflow::{WorkflowDefinition, WorkflowGraph};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowRepository`.
pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row type
// ---------------------------------------------------------------------------

struct WorkflowRow {
    id: String,
    user_id: String,
    name: String,
    state: String,
    variables: Option<String>,
    run_count: i64,
    last_run_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl WorkflowRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            state: row.try_get("state")?,
            variables: row.try_get("variables")?,
            run_count: row.try_get("run_count")?,
            last_run_at: row.try_get("last_run_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_definition(self) -> Result<WorkflowDefinition, RepositoryError> {
        let state: WorkflowGraph = serde_json::from_str(&self.state)
            .map_err(|e| RepositoryError::Query(format!("invalid workflow state JSON: {e}")))?;

        let variables = self
            .variables
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid variables JSON: {e}")))
            })
            .transpose()?;

        Ok(WorkflowDefinition {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            name: self.name,
            state,
            variables,
            run_count: self.run_count,
            last_run_at: self.last_run_at.as_deref().map(parse_datetime).transpose()?,
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
// WorkflowRepository impl
// ---------------------------------------------------------------------------

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn get(&self, id: &Uuid) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let r = WorkflowRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(r.into_definition()?))
            }
            None => Ok(None),
        }
    }

    async fn record_successful_run(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE workflows SET run_count = run_count + 1, last_run_at = ? WHERE id = ?",
        )
        .bind(at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn increment_webhook_usage(&self, user_id: &Uuid) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO user_stats (user_id, total_webhook_triggers, updated_at)
               VALUES (?, 1, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                 total_webhook_triggers = total_webhook_triggers + 1,
                 updated_at = excluded.updated_at"#,
        )
        .bind(user_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn insert_workflow(pool: &DatabasePool, variables: Option<&str>) -> (Uuid, Uuid) {
        let workflow_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let state = json!({
            "blocks": {
                "start": {"id": "start", "type": "starter", "subBlocks": {}}
            },
            "edges": [],
            "loops": {}
        });
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO workflows (id, user_id, name, state, variables, created_at, updated_at) VALUES (?, ?, 'order-sync', ?, ?, ?, ?)",
        )
        .bind(workflow_id.to_string())
        .bind(user_id.to_string())
        .bind(state.to_string())
        .bind(variables)
        .bind(&now)
        .bind(&now)
        .execute(&pool.writer)
        .await
        .unwrap();
        (workflow_id, user_id)
    }

    #[tokio::test]
    async fn test_get_workflow() {
        let pool = test_pool().await;
        let repo = SqliteWorkflowRepository::new(pool.clone());
        let (workflow_id, user_id) = insert_workflow(&pool, None).await;

        let wf = repo.get(&workflow_id).await.unwrap().unwrap();
        assert_eq!(wf.name, "order-sync");
        assert_eq!(wf.user_id, user_id);
        assert_eq!(wf.run_count, 0);
        assert!(wf.state.blocks.contains_key("start"));
        assert!(wf.variables.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_workflow() {
        let pool = test_pool().await;
        let repo = SqliteWorkflowRepository::new(pool);
        assert!(repo.get(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_variables_survive_as_stored_json() {
        let pool = test_pool().await;
        let repo = SqliteWorkflowRepository::new(pool.clone());
        // Stored as a JSON string value, the tolerant parse happens later
        let (workflow_id, _) = insert_workflow(&pool, Some(r#""{\"region\":\"eu\"}""#)).await;

        let wf = repo.get(&workflow_id).await.unwrap().unwrap();
        assert!(matches!(wf.variables, Some(serde_json::Value::String(_))));
    }

    #[tokio::test]
    async fn test_record_successful_run_bumps_counters() {
        let pool = test_pool().await;
        let repo = SqliteWorkflowRepository::new(pool.clone());
        let (workflow_id, _) = insert_workflow(&pool, None).await;

        let at = Utc::now();
        repo.record_successful_run(&workflow_id, at).await.unwrap();
        repo.record_successful_run(&workflow_id, at).await.unwrap();

        let wf = repo.get(&workflow_id).await.unwrap().unwrap();
        assert_eq!(wf.run_count, 2);
        assert!(wf.last_run_at.is_some());
    }

    #[tokio::test]
    async fn test_record_run_for_missing_workflow() {
        let pool = test_pool().await;
        let repo = SqliteWorkflowRepository::new(pool);
        let result = repo.record_successful_run(&Uuid::now_v7(), Utc::now()).await;
        assert!(matches!(result.unwrap_err(), RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_increment_webhook_usage_upserts() {
        let pool = test_pool().await;
        let repo = SqliteWorkflowRepository::new(pool.clone());
        let user_id = Uuid::now_v7();

        repo.increment_webhook_usage(&user_id).await.unwrap();
        repo.increment_webhook_usage(&user_id).await.unwrap();
        repo.increment_webhook_usage(&user_id).await.unwrap();

        let (count,): (i64,) =
            sqlx::query_as("SELECT total_webhook_triggers FROM user_stats WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(&pool.reader)
                .await
                .unwrap();
        assert_eq!(count, 3);
    }
}
