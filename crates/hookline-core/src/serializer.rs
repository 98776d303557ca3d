//! Workflow serializer.
//!
//! Converts the stored block/edge/loop graph plus resolved per-block
//! parameter state into the executable representation handed to the engine.

use std::collections::HashMap;

use hookline_types::error::ExecutionError;
use hookline_types::execution::{SerializedBlock, SerializedWorkflow};
use hookline_types::workflow::WorkflowGraph;
use serde_json::Value;

/// Serialization format version stamped on executable graphs.
const SERIALIZER_VERSION: &str = "1.0";

/// Converts a stored graph into an executable one.
pub trait WorkflowSerializer: Send + Sync {
    fn serialize(
        &self,
        graph: &WorkflowGraph,
        block_states: &HashMap<String, HashMap<String, Value>>,
    ) -> Result<SerializedWorkflow, ExecutionError>;
}

/// Default serializer: flattens blocks into an ordered list with their
/// resolved parameters and carries edges/loops through unchanged.
#[derive(Debug, Clone, Default)]
pub struct GraphSerializer;

impl GraphSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl WorkflowSerializer for GraphSerializer {
    fn serialize(
        &self,
        graph: &WorkflowGraph,
        block_states: &HashMap<String, HashMap<String, Value>>,
    ) -> Result<SerializedWorkflow, ExecutionError> {
        // Deterministic block order keeps the executable graph stable for
        // identical inputs.
        let mut ids: Vec<&String> = graph.blocks.keys().collect();
        ids.sort();

        let mut blocks = Vec::with_capacity(ids.len());
        for id in ids {
            let block = &graph.blocks[id];
            let params = block_states.get(id).cloned().unwrap_or_default();
            blocks.push(SerializedBlock {
                id: block.id.clone(),
                block_type: block.block_type.clone(),
                name: block.name.clone(),
                enabled: block.enabled,
                params,
            });
        }

        // Edges referencing unknown blocks make the graph unexecutable.
        for edge in &graph.edges {
            if !graph.blocks.contains_key(&edge.source) {
                return Err(ExecutionError::Serialize(format!(
                    "edge references unknown source block '{}'",
                    edge.source
                )));
            }
            if !graph.blocks.contains_key(&edge.target) {
                return Err(ExecutionError::Serialize(format!(
                    "edge references unknown target block '{}'",
                    edge.target
                )));
            }
        }

        Ok(SerializedWorkflow {
            version: SERIALIZER_VERSION.to_string(),
            blocks,
            edges: graph.edges.clone(),
            loops: graph.loops.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph_with_two_blocks() -> WorkflowGraph {
        serde_json::from_value(json!({
            "blocks": {
                "a": {"id": "a", "type": "starter", "subBlocks": {}},
                "b": {"id": "b", "type": "agent", "subBlocks": {}}
            },
            "edges": [{"source": "a", "target": "b"}],
            "loops": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_serialize_attaches_resolved_params() {
        let graph = graph_with_two_blocks();
        let states = HashMap::from([(
            "b".to_string(),
            HashMap::from([("prompt".to_string(), json!("go"))]),
        )]);

        let serialized = GraphSerializer::new().serialize(&graph, &states).unwrap();
        assert_eq!(serialized.blocks.len(), 2);
        let b = serialized.blocks.iter().find(|bl| bl.id == "b").unwrap();
        assert_eq!(b.params["prompt"], json!("go"));
        let a = serialized.blocks.iter().find(|bl| bl.id == "a").unwrap();
        assert!(a.params.is_empty());
    }

    #[test]
    fn test_serialize_rejects_dangling_edges() {
        let mut graph = graph_with_two_blocks();
        graph.edges[0].target = "ghost".to_string();

        let err = GraphSerializer::new()
            .serialize(&graph, &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let graph = graph_with_two_blocks();
        let s1 = GraphSerializer::new().serialize(&graph, &HashMap::new()).unwrap();
        let s2 = GraphSerializer::new().serialize(&graph, &HashMap::new()).unwrap();
        let ids1: Vec<_> = s1.blocks.iter().map(|b| &b.id).collect();
        let ids2: Vec<_> = s2.blocks.iter().map(|b| &b.id).collect();
        assert_eq!(ids1, ids2);
    }
}
