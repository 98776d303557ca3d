//! Workflow domain types.
//!
//! The dispatcher treats workflows as read-only: it loads the stored graph,
//! merges sub-block state, hands the result to the serializer, and bumps run
//! counters after a successful execution. Graph JSON uses camelCase keys as
//! written by the builder surface.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A stored automation workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: Uuid,
    /// Owner; keys the env-var and OAuth token lookups.
    pub user_id: Uuid,
    pub name: String,
    /// The blocks/edges/loops graph.
    pub state: WorkflowGraph,
    /// Workflow-level variables. May arrive as a JSON string needing a
    /// second parse, or as an already-parsed object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    /// Total successful runs.
    #[serde(default)]
    pub run_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The stored block/edge/loop graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowGraph {
    pub blocks: HashMap<String, Block>,
    pub edges: Vec<Edge>,
    pub loops: HashMap<String, LoopConfig>,
}

/// A single block in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Per-parameter state keyed by sub-block id.
    #[serde(default)]
    pub sub_blocks: HashMap<String, SubBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
}

fn default_enabled() -> bool {
    true
}

/// One configurable parameter slot on a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubBlock {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A directed connection between two blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

/// Loop grouping metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoopConfig {
    pub id: String,
    pub nodes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<i64>,
    #[serde(rename = "loopType", skip_serializing_if = "Option::is_none")]
    pub loop_type: Option<String>,
}
