//! SQLite execution log sink.
//!
//! Persists one `workflow_execution_logs` row per execution, or per
//! execution error for runs that failed before producing a result. Trace
//! spans are stored as a JSON blob on the row.

use hookline_core::logs::ExecutionLogSink;
use hookline_types::error::RepositoryError;
use hookline_types::execution::{
    ExecutionLogRecord, ExecutionResult, TraceSpan, TriggerType,
};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ExecutionLogSink`.
pub struct SqliteExecutionLogSink {
    pool: DatabasePool,
}

impl SqliteExecutionLogSink {
    /// Create a new sink backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &ExecutionLogRecord) -> Result<(), RepositoryError> {
        let spans_json = serde_json::to_string(&record.trace_spans)
            .map_err(|e| RepositoryError::Query(format!("serialize trace spans: {e}")))?;

        sqlx::query(
            r#"INSERT INTO workflow_execution_logs
               (id, workflow_id, execution_id, trigger, success, duration_ms,
                started_at, ended_at, trace_spans, error, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(record.workflow_id.to_string())
        .bind(&record.execution_id)
        .bind(record.trigger.as_str())
        .bind(record.success)
        .bind(record.duration_ms as i64)
        .bind(record.started_at.to_rfc3339())
        .bind(record.ended_at.to_rfc3339())
        .bind(&spans_json)
        .bind(&record.error)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    /// Most recent records for a workflow, newest first.
    pub async fn recent(
        &self,
        workflow_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<ExecutionLogRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM workflow_execution_logs WHERE workflow_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(workflow_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(record_from_row(row)?);
        }
        Ok(records)
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExecutionLogRecord, RepositoryError> {
    let get_str = |name: &str| -> Result<String, RepositoryError> {
        row.try_get(name)
            .map_err(|e| RepositoryError::Query(e.to_string()))
    };

    let trigger_str = get_str("trigger")?;
    let trigger: TriggerType =
        serde_json::from_value(serde_json::Value::String(trigger_str.clone()))
            .map_err(|_| RepositoryError::Query(format!("invalid trigger: {trigger_str}")))?;

    let spans_json = get_str("trace_spans")?;
    let trace_spans: Vec<TraceSpan> = serde_json::from_str(&spans_json)
        .map_err(|e| RepositoryError::Query(format!("invalid trace spans JSON: {e}")))?;

    let success: bool = row
        .try_get("success")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let duration_ms: i64 = row
        .try_get("duration_ms")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let error: Option<String> = row
        .try_get("error")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

    Ok(ExecutionLogRecord {
        id: parse_uuid(&get_str("id")?)?,
        workflow_id: parse_uuid(&get_str("workflow_id")?)?,
        execution_id: get_str("execution_id")?,
        trigger,
        success,
        duration_ms: duration_ms.max(0) as u64,
        started_at: parse_datetime(&get_str("started_at")?)?,
        ended_at: parse_datetime(&get_str("ended_at")?)?,
        trace_spans,
        error,
        created_at: parse_datetime(&get_str("created_at")?)?,
    })
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

impl ExecutionLogSink for SqliteExecutionLogSink {
    async fn persist_logs(
        &self,
        workflow_id: &Uuid,
        execution_id: &str,
        result: &ExecutionResult,
        spans: &[TraceSpan],
        trigger: TriggerType,
    ) -> Result<(), RepositoryError> {
        let record = ExecutionLogRecord {
            id: Uuid::now_v7(),
            workflow_id: *workflow_id,
            execution_id: execution_id.to_string(),
            trigger,
            success: result.success,
            duration_ms: result.metadata.duration_ms,
            started_at: result.metadata.started_at,
            ended_at: result.metadata.ended_at,
            trace_spans: spans.to_vec(),
            error: None,
            created_at: Utc::now(),
        };
        self.insert(&record).await
    }

    async fn persist_error(
        &self,
        workflow_id: &Uuid,
        execution_id: &str,
        error: &str,
        trigger: TriggerType,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let record = ExecutionLogRecord {
            id: Uuid::now_v7(),
            workflow_id: *workflow_id,
            execution_id: execution_id.to_string(),
            trigger,
            success: false,
            duration_ms: 0,
            started_at: now,
            ended_at: now,
            trace_spans: vec![],
            error: Some(error.to_string()),
            created_at: now,
        };
        self.insert(&record).await
    }
}
