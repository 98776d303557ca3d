//! Execution engine trait.
//!
//! The engine is a black box: given a serialized workflow, resolved block
//! parameters, decrypted secrets, trigger input, and declared variables, it
//! runs the workflow and returns a structured result. Hookline never looks
//! inside engine semantics; it only builds trace spans from the result.

use hookline_types::error::ExecutionError;
use hookline_types::execution::{ExecutionRequest, ExecutionResult, SerializedWorkflow};

/// Runs a serialized workflow.
pub trait ExecutionEngine: Send + Sync {
    fn execute(
        &self,
        workflow: &SerializedWorkflow,
        request: &ExecutionRequest,
    ) -> impl std::future::Future<Output = Result<ExecutionResult, ExecutionError>> + Send;
}
