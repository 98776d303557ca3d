//! HTTP execution engine client.
//!
//! Hookline does not run workflow blocks itself; it forwards the prepared
//! execution (serialized workflow, resolved parameters, decrypted env,
//! trigger input, variables) to the execution engine service and decodes
//! the structured result.

use std::time::Duration;

use hookline_core::engine::ExecutionEngine;
use hookline_types::error::ExecutionError;
use hookline_types::execution::{ExecutionRequest, ExecutionResult, SerializedWorkflow};
use serde_json::{Value, json};

/// Execution engine reached over HTTP.
pub struct HttpExecutionEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExecutionEngine {
    /// Create a new client for an engine at `base_url`.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            // Executions can legitimately run for minutes
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self { client, base_url }
    }
}

/// Build the JSON body sent to the engine's execute endpoint.
fn build_request_body(workflow: &SerializedWorkflow, request: &ExecutionRequest) -> Value {
    json!({
        "workflow": workflow,
        "executionId": request.execution_id,
        "requestId": request.request_id,
        "input": request.input,
        "blockStates": request.block_states,
        "env": request.env,
        "variables": request.variables,
    })
}

impl ExecutionEngine for HttpExecutionEngine {
    async fn execute(
        &self,
        workflow: &SerializedWorkflow,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        let url = format!("{}/execute", self.base_url);
        let body = build_request_body(workflow, request);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExecutionError::Engine(format!("engine unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExecutionError::Engine(format!(
                "engine returned {status}: {message}"
            )));
        }

        response
            .json::<ExecutionResult>()
            .await
            .map_err(|e| ExecutionError::Engine(format!("invalid engine response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_request_body_shape() {
        let workflow = SerializedWorkflow {
            version: "1.0".to_string(),
            blocks: vec![],
            edges: vec![],
            loops: HashMap::new(),
        };
        let request = ExecutionRequest {
            execution_id: "exec-1".to_string(),
            request_id: "req-1".to_string(),
            input: json!({"webhook": {}}),
            block_states: HashMap::new(),
            env: HashMap::from([("API_KEY".to_string(), "sk".to_string())]),
            variables: HashMap::new(),
        };

        let body = build_request_body(&workflow, &request);
        assert_eq!(body["executionId"], "exec-1");
        assert_eq!(body["requestId"], "req-1");
        assert_eq!(body["workflow"]["version"], "1.0");
        assert_eq!(body["env"]["API_KEY"], "sk");
    }
}
