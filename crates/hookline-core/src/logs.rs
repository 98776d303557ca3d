//! Execution log persistence trait and trace span construction.
//!
//! An execution result is converted into trace spans (one per block step)
//! and handed to the sink together with the run-level outcome. Failed
//! executions that never produced a result are persisted as structured
//! execution errors instead.

use hookline_types::error::RepositoryError;
use hookline_types::execution::{ExecutionResult, TraceSpan, TriggerType};
use uuid::Uuid;

/// Durable sink for execution outcomes.
pub trait ExecutionLogSink: Send + Sync {
    /// Persist a completed execution's result and its trace spans.
    fn persist_logs(
        &self,
        workflow_id: &Uuid,
        execution_id: &str,
        result: &ExecutionResult,
        spans: &[TraceSpan],
        trigger: TriggerType,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist a structured execution error for a run that failed before
    /// (or instead of) producing a result.
    fn persist_error(
        &self,
        workflow_id: &Uuid,
        execution_id: &str,
        error: &str,
        trigger: TriggerType,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// Build one trace span per block step in the result.
pub fn build_trace_spans(execution_id: &str, result: &ExecutionResult) -> Vec<TraceSpan> {
    result
        .logs
        .iter()
        .enumerate()
        .map(|(i, log)| TraceSpan {
            id: format!("{execution_id}-{i}"),
            name: log
                .block_name
                .clone()
                .unwrap_or_else(|| log.block_id.clone()),
            span_type: log.block_type.clone().unwrap_or_else(|| "block".to_string()),
            duration_ms: log.duration_ms,
            start_time: log.started_at,
            end_time: log.ended_at,
            status: if log.success { "success" } else { "error" }.to_string(),
            error: log.error.clone(),
        })
        .collect()
}
