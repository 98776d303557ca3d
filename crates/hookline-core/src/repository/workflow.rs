//! Workflow repository trait.
//!
//! Workflows are read-only to the dispatcher apart from counter bumps after
//! a successful execution.

use chrono::{DateTime, Utc};
use hookline_types::error::RepositoryError;
use hookline_types::workflow::WorkflowDefinition;
use uuid::Uuid;

/// Repository trait for stored workflows.
pub trait WorkflowRepository: Send + Sync {
    /// Get a workflow definition by its UUID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowDefinition>, RepositoryError>> + Send;

    /// Increment the workflow's run counter and stamp the last run time.
    fn record_successful_run(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Increment the owner's webhook-trigger usage counter.
    fn increment_webhook_usage(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
