//! Execution request/result types and the durable log record.
//!
//! `ExecutionRequest` is built fresh per trigger and never persisted; only
//! the resulting `ExecutionLogRecord` (with its trace spans) is durable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::workflow::{Edge, LoopConfig};

/// What caused a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Webhook,
    Manual,
    Schedule,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Webhook => "webhook",
            TriggerType::Manual => "manual",
            TriggerType::Schedule => "schedule",
        }
    }
}

/// Ephemeral, per-invocation execution input.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Globally unique id for this execution.
    pub execution_id: String,
    /// The HTTP call this execution belongs to, for log correlation.
    pub request_id: String,
    /// Provider-shaped trigger payload.
    pub input: Value,
    /// Resolved parameter values per block.
    pub block_states: HashMap<String, HashMap<String, Value>>,
    /// Decrypted environment variables for the workflow owner.
    pub env: HashMap<String, String>,
    /// Parsed workflow-level variables.
    pub variables: HashMap<String, Value>,
}

/// The executable representation produced by the workflow serializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedWorkflow {
    pub version: String,
    pub blocks: Vec<SerializedBlock>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub loops: HashMap<String, LoopConfig>,
}

/// One executable block with its resolved parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

/// What the execution engine returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Final output of the workflow (opaque to the dispatcher).
    #[serde(default)]
    pub output: Value,
    pub metadata: ExecutionMetadata,
    /// Per-block step records, used to build trace spans.
    #[serde(default)]
    pub logs: Vec<BlockLog>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// A single step record from the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLog {
    pub block_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A structured timing/step record derived from an execution result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSpan {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub span_type: String,
    pub duration_ms: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// "success" or "error".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The durable record persisted per execution (or per execution error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogRecord {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub execution_id: String,
    pub trigger: TriggerType,
    pub success: bool,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default)]
    pub trace_spans: Vec<TraceSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
