//! The webhook dispatcher.
//!
//! Orchestrates a delivery end to end: content-hash deduplication,
//! registration lookup, provider branching (auth, message-level dedup,
//! input shaping), execution invocation, and log persistence. The
//! verification path (provider handshakes and liveness probes) is
//! side-effect free.
//!
//! The dispatcher is generic over its collaborators and pinned to concrete
//! infra implementations by the application layer.

pub mod execute;
pub mod hash;
pub mod providers;

mod airtable;

use chrono::Utc;
use hookline_types::error::{ExecutionError, RepositoryError};
use hookline_types::execution::{ExecutionRequest, ExecutionResult, TriggerType};
use hookline_types::webhook::{
    HeaderSnapshot, SlackSigningConfig, VerificationConfig, WebhookProvider, WebhookRegistration,
};
use hookline_types::workflow::WorkflowDefinition;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::airtable_api::AirtablePayloadsApi;
use crate::engine::ExecutionEngine;
use crate::logs::{ExecutionLogSink, build_trace_spans};
use crate::repository::webhook::WebhookRepository;
use crate::repository::workflow::WorkflowRepository;
use crate::secrets::SecretStore;
use crate::serializer::WorkflowSerializer;
use crate::storage::dedup_store::{DEFAULT_DEDUP_TTL, DedupStore};

use providers::generic::AuthFailure;
use providers::slack::SlackPayload;

/// The expected `hub.mode` value for provider handshakes.
const SUBSCRIBE_MODE: &str = "subscribe";

// ---------------------------------------------------------------------------
// Response model
// ---------------------------------------------------------------------------

/// An HTTP-framework-agnostic dispatch outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: DispatchBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchBody {
    Text(String),
    Json(Value),
}

impl DispatchResponse {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: DispatchBody::Text(body.into()),
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: DispatchBody::Json(body),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures that escape the dispatcher. The HTTP layer maps these to 500.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A cursor write failed mid-poll. Re-thrown rather than swallowed:
    /// an unpersisted cursor risks reprocessing or skipping future pages.
    #[error("cursor persistence failed: {0}")]
    CursorPersist(RepositoryError),
}

// ---------------------------------------------------------------------------
// Verification query
// ---------------------------------------------------------------------------

/// The `hub.*` query parameters of a GET probe.
#[derive(Debug, Clone, Default)]
pub struct VerificationQuery {
    pub mode: Option<String>,
    pub verify_token: Option<String>,
    pub challenge: Option<String>,
}

impl VerificationQuery {
    fn handshake(&self) -> Option<(&str, &str, &str)> {
        match (&self.mode, &self.verify_token, &self.challenge) {
            (Some(m), Some(t), Some(c)) => Some((m, t, c)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Orchestrates webhook verification and delivery.
pub struct WebhookDispatcher<WH, WF, D, S, Z, E, L, A> {
    pub(crate) webhooks: WH,
    pub(crate) workflows: WF,
    pub(crate) dedup: D,
    pub(crate) secrets: S,
    pub(crate) serializer: Z,
    pub(crate) engine: E,
    pub(crate) logs: L,
    pub(crate) airtable: A,
}

impl<WH, WF, D, S, Z, E, L, A> WebhookDispatcher<WH, WF, D, S, Z, E, L, A>
where
    WH: WebhookRepository,
    WF: WorkflowRepository,
    D: DedupStore,
    S: SecretStore,
    Z: WorkflowSerializer,
    E: ExecutionEngine,
    L: ExecutionLogSink,
    A: AirtablePayloadsApi,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        webhooks: WH,
        workflows: WF,
        dedup: D,
        secrets: S,
        serializer: Z,
        engine: E,
        logs: L,
        airtable: A,
    ) -> Self {
        Self {
            webhooks,
            workflows,
            dedup,
            secrets,
            serializer,
            engine,
            logs,
            airtable,
        }
    }

    // -----------------------------------------------------------------------
    // Verification path (read-only)
    // -----------------------------------------------------------------------

    /// Handle a GET probe: provider handshake or liveness check.
    ///
    /// Never touches deduplication, secrets, or the execution engine.
    pub async fn verify(
        &self,
        path: &str,
        query: &VerificationQuery,
    ) -> Result<DispatchResponse, DispatchError> {
        if let Some((mode, token, challenge)) = query.handshake() {
            let registrations = self
                .webhooks
                .find_active_by_provider(WebhookProvider::Whatsapp)
                .await?;

            let matched = registrations.iter().any(|reg| {
                VerificationConfig::from_config(&reg.provider_config)
                    .verification_token
                    .as_deref()
                    == Some(token)
            });

            return Ok(if !matched {
                DispatchResponse::text(403, "Verification token mismatch")
            } else if mode != SUBSCRIBE_MODE {
                DispatchResponse::text(400, "Invalid verification mode")
            } else {
                DispatchResponse::text(200, challenge)
            });
        }

        match self.webhooks.find_active_by_path(path).await? {
            Some(_) => Ok(DispatchResponse::text(200, "OK")),
            None => Ok(DispatchResponse::text(404, "Webhook not found")),
        }
    }

    // -----------------------------------------------------------------------
    // Delivery path (state-changing)
    // -----------------------------------------------------------------------

    /// Handle a POST delivery: execute the workflow at most
    /// effectively-once per logically-distinct delivery.
    pub async fn deliver(
        &self,
        path: &str,
        headers: &HeaderSnapshot,
        raw_body: &str,
    ) -> Result<DispatchResponse, DispatchError> {
        let body: Value = if raw_body.trim().is_empty() {
            json!({})
        } else {
            match serde_json::from_str(raw_body) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(%path, error = %e, "rejecting unparsable delivery body");
                    return Ok(DispatchResponse::text(400, "Invalid JSON payload"));
                }
            }
        };

        // Content-derived dedup, independent of transport message ids.
        let content_key = hash::content_dedup_key(path, &body);
        match self.dedup.has_processed(&content_key).await {
            Ok(true) => {
                tracing::info!(%path, "duplicate delivery (content hash)");
                return Ok(DispatchResponse::text(200, "Duplicate request"));
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(%path, error = %e, "dedup store check failed; continuing");
            }
        }

        let Some(registration) = self.webhooks.find_active_by_path(path).await? else {
            return Ok(DispatchResponse::text(404, "Webhook not found"));
        };
        let Some(workflow) = self.workflows.get(&registration.workflow_id).await? else {
            tracing::warn!(%path, workflow_id = %registration.workflow_id, "registration points at a missing workflow");
            return Ok(DispatchResponse::text(404, "Workflow not found"));
        };

        let request_id = Uuid::now_v7().to_string();
        tracing::info!(
            %path,
            provider = registration.provider.as_str(),
            %request_id,
            "handling webhook delivery"
        );

        let response = match registration.provider {
            WebhookProvider::Slack => {
                self.handle_slack(&registration, &workflow, headers, raw_body, &body, &request_id)
                    .await?
            }
            WebhookProvider::Whatsapp => {
                self.handle_whatsapp(&registration, &workflow, headers, &body, &request_id)
                    .await?
            }
            WebhookProvider::Airtable => {
                self.handle_airtable(&registration, &workflow, &body, &request_id)
                    .await?
            }
            WebhookProvider::Github
            | WebhookProvider::Stripe
            | WebhookProvider::Generic
            | WebhookProvider::Other => {
                self.handle_generic(&registration, &workflow, headers, &body, &request_id)
                    .await?
            }
        };

        // Mark the content hash only once the branch got past auth, so a
        // corrected retry of a rejected delivery can still succeed.
        if response.status != 401 && response.status != 403 {
            if let Err(e) = self.dedup.mark_processed(&content_key, DEFAULT_DEDUP_TTL).await {
                tracing::warn!(%path, error = %e, "failed to mark content hash processed");
            }
        }

        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Provider branches
    // -----------------------------------------------------------------------

    async fn handle_slack(
        &self,
        registration: &WebhookRegistration,
        workflow: &WorkflowDefinition,
        headers: &HeaderSnapshot,
        raw_body: &str,
        body: &Value,
        request_id: &str,
    ) -> Result<DispatchResponse, DispatchError> {
        let signing = SlackSigningConfig::from_config(&registration.provider_config);
        if let Some(secret) = signing.signing_secret.as_deref().filter(|s| !s.is_empty()) {
            let signature = headers.get(providers::slack::SIGNATURE_HEADER);
            let timestamp = headers.get(providers::slack::TIMESTAMP_HEADER);
            match (signature, timestamp) {
                (Some(signature), Some(timestamp)) if !raw_body.is_empty() => {
                    if !providers::slack::verify_signature(secret, timestamp, raw_body, signature) {
                        tracing::warn!(path = %registration.path, "Slack signature mismatch");
                        return Ok(DispatchResponse::text(401, "Invalid Slack signature"));
                    }
                }
                _ => {
                    return Ok(DispatchResponse::text(400, "Missing Slack signature headers"));
                }
            }
        }

        match providers::slack::classify(body) {
            // Slack's own handshake: echo the challenge, touch nothing else.
            SlackPayload::UrlVerification { challenge } => {
                Ok(DispatchResponse::json(200, json!({ "challenge": challenge })))
            }
            SlackPayload::Event { event_id } => {
                // Transport-native id preferred over the content hash:
                // retried deliveries of the same event may differ in body.
                if let Some(event_id) = event_id {
                    let key = format!("slack:event:{event_id}");
                    match self.dedup.has_processed(&key).await {
                        Ok(true) => {
                            return Ok(DispatchResponse::text(200, "Duplicate message"));
                        }
                        Ok(false) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Slack event dedup check failed; continuing");
                        }
                    }
                    if let Err(e) = self.dedup.mark_processed(&key, DEFAULT_DEDUP_TTL).await {
                        tracing::warn!(error = %e, "failed to mark Slack event processed");
                    }
                }

                let input = providers::webhook_input(registration, body, headers, "POST");
                let execution_id = Uuid::now_v7().to_string();
                self.execute_workflow(workflow, input, &execution_id, request_id)
                    .await?;
                Ok(DispatchResponse::json(200, json!({"message": "Webhook processed"})))
            }
        }
    }

    async fn handle_whatsapp(
        &self,
        registration: &WebhookRegistration,
        workflow: &WorkflowDefinition,
        headers: &HeaderSnapshot,
        body: &Value,
        request_id: &str,
    ) -> Result<DispatchResponse, DispatchError> {
        let Some(message) = providers::whatsapp::first_message(body) else {
            // Status callback (delivery receipts etc.) -- acknowledge only.
            return Ok(DispatchResponse::text(200, "OK"));
        };

        let key = format!("whatsapp:msg:{}", message.message_id);
        match self.dedup.has_processed(&key).await {
            Ok(true) => return Ok(DispatchResponse::text(200, "Duplicate message")),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "WhatsApp message dedup check failed; continuing");
            }
        }
        if let Err(e) = self.dedup.mark_processed(&key, DEFAULT_DEDUP_TTL).await {
            tracing::warn!(error = %e, "failed to mark WhatsApp message processed");
        }

        let mut input = providers::webhook_input(registration, body, headers, "POST");
        if let Value::Object(obj) = &mut input {
            obj.insert(
                "whatsapp".to_string(),
                providers::whatsapp::message_input(&message),
            );
        }

        let execution_id = Uuid::now_v7().to_string();
        self.execute_workflow(workflow, input, &execution_id, request_id)
            .await?;
        Ok(DispatchResponse::json(200, json!({"message": "Webhook processed"})))
    }

    async fn handle_generic(
        &self,
        registration: &WebhookRegistration,
        workflow: &WorkflowDefinition,
        headers: &HeaderSnapshot,
        body: &Value,
        request_id: &str,
    ) -> Result<DispatchResponse, DispatchError> {
        let auth =
            hookline_types::webhook::InboundAuthConfig::from_config(&registration.provider_config);
        match providers::generic::check_auth(&auth, headers) {
            Ok(()) => {}
            Err(AuthFailure::Token) => {
                return Ok(DispatchResponse::text(401, "Unauthorized"));
            }
            Err(AuthFailure::Ip) => {
                return Ok(DispatchResponse::text(403, "Forbidden"));
            }
        }

        let input = providers::webhook_input(registration, body, headers, "POST");
        let execution_id = Uuid::now_v7().to_string();
        self.execute_workflow(workflow, input, &execution_id, request_id)
            .await?;
        Ok(DispatchResponse::json(200, json!({"message": "Webhook processed"})))
    }

    // -----------------------------------------------------------------------
    // Execution invocation (shared)
    // -----------------------------------------------------------------------

    /// Prepare and run a workflow execution, always persisting logs on
    /// completion or a structured error on failure.
    pub(crate) async fn execute_workflow(
        &self,
        workflow: &WorkflowDefinition,
        input: Value,
        execution_id: &str,
        request_id: &str,
    ) -> Result<ExecutionResult, DispatchError> {
        match self.try_execute(workflow, input, execution_id, request_id).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if let Err(persist_err) = self
                    .logs
                    .persist_error(&workflow.id, execution_id, &e.to_string(), TriggerType::Webhook)
                    .await
                {
                    tracing::error!(
                        workflow_id = %workflow.id,
                        %execution_id,
                        error = %persist_err,
                        "failed to persist execution error"
                    );
                }
                Err(DispatchError::Execution(e))
            }
        }
    }

    async fn try_execute(
        &self,
        workflow: &WorkflowDefinition,
        input: Value,
        execution_id: &str,
        request_id: &str,
    ) -> Result<ExecutionResult, ExecutionError> {
        let block_states = execute::resolve_block_states(&workflow.state);

        // Any single decryption failure aborts: partial environments are
        // not tolerated.
        let env = self.secrets.decrypted_env(&workflow.user_id).await?;

        let serialized = self.serializer.serialize(&workflow.state, &block_states)?;
        let variables = execute::parse_variables(workflow.variables.as_ref());

        let request = ExecutionRequest {
            execution_id: execution_id.to_string(),
            request_id: request_id.to_string(),
            input,
            block_states,
            env,
            variables,
        };

        tracing::info!(
            workflow_id = %workflow.id,
            %execution_id,
            %request_id,
            "invoking execution engine"
        );
        let result = self.engine.execute(&serialized, &request).await?;

        if result.success {
            if let Err(e) = self
                .workflows
                .record_successful_run(&workflow.id, Utc::now())
                .await
            {
                tracing::warn!(workflow_id = %workflow.id, error = %e, "failed to bump run counter");
            }
            if let Err(e) = self.workflows.increment_webhook_usage(&workflow.user_id).await {
                tracing::warn!(user_id = %workflow.user_id, error = %e, "failed to bump usage counter");
            }
        }

        // Log persistence failures are isolated per execution, never
        // surfaced as dispatcher failures.
        let spans = build_trace_spans(execution_id, &result);
        if let Err(e) = self
            .logs
            .persist_logs(&workflow.id, execution_id, &result, &spans, TriggerType::Webhook)
            .await
        {
            tracing::error!(
                workflow_id = %workflow.id,
                %execution_id,
                error = %e,
                "failed to persist execution logs"
            );
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
