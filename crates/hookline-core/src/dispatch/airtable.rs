//! The Airtable branch of the dispatcher.
//!
//! An Airtable ping carries no record data; it tells us to poll the
//! payloads API. The branch dedups the ping against a per-registration
//! notification ring, polls pages under an iteration cap, persists the
//! cursor after every advance, consolidates changes across pages, and runs
//! the workflow once for the whole batch.
//!
//! Almost every failure is acknowledged with 200 after persisting an
//! execution error, so Airtable does not retry storms at us. The exception
//! is a failed cursor write mid-poll, which aborts the ping and surfaces
//! as a 500.

use hookline_types::webhook::{
    AirtablePollingState, AirtableSettings, CursorField, WebhookRegistration,
};
use hookline_types::execution::TriggerType;
use hookline_types::workflow::WorkflowDefinition;
use serde_json::{Value, json};

use crate::airtable_api::AirtablePayloadsApi;
use crate::engine::ExecutionEngine;
use crate::logs::ExecutionLogSink;
use crate::repository::webhook::WebhookRepository;
use crate::repository::workflow::WorkflowRepository;
use crate::secrets::SecretStore;
use crate::serializer::WorkflowSerializer;
use crate::storage::dedup_store::DedupStore;

use super::providers::airtable::{ChangeConsolidator, PingIdentity};
use super::{DispatchError, DispatchResponse, WebhookDispatcher};

/// Upper bound on payload pages fetched per ping.
const MAX_POLL_ITERATIONS: usize = 10;

const OAUTH_PROVIDER: &str = "airtable";

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
    pub(crate) async fn handle_airtable(
        &self,
        registration: &WebhookRegistration,
        workflow: &WorkflowDefinition,
        body: &Value,
        request_id: &str,
    ) -> Result<DispatchResponse, DispatchError> {
        match self.process_ping(registration, workflow, body, request_id).await {
            Ok(()) => Ok(DispatchResponse::text(200, "Airtable ping processed successfully")),
            Err(e) => {
                let message = e.to_string();
                tracing::error!(
                    path = %registration.path,
                    workflow_id = %workflow.id,
                    error = %message,
                    "Airtable ping handling failed"
                );
                // Execution failures were already persisted by the shared
                // execution path.
                if !matches!(e, DispatchError::Execution(_)) {
                    if let Err(persist_err) = self
                        .logs
                        .persist_error(&workflow.id, request_id, &message, TriggerType::Webhook)
                        .await
                    {
                        tracing::error!(
                            workflow_id = %workflow.id,
                            error = %persist_err,
                            "failed to persist Airtable ping error"
                        );
                    }
                }
                Ok(DispatchResponse::text(
                    500,
                    format!("Error processing Airtable webhook: {message}"),
                ))
            }
        }
    }

    async fn process_ping(
        &self,
        registration: &WebhookRegistration,
        workflow: &WorkflowDefinition,
        body: &Value,
        request_id: &str,
    ) -> Result<(), DispatchError> {
        let settings = AirtableSettings::from_config(&registration.provider_config);
        let mut state = AirtablePollingState::from_config(&registration.provider_config);
        let mut config = registration.provider_config.clone();

        // Ping-level dedup against the per-registration notification ring.
        // Ring writes are best-effort: on failure we favor over-processing
        // a future duplicate over dropping this ping.
        if let Some(key) = PingIdentity::from_body(body, settings.external_webhook_id.as_deref())
            .and_then(|identity| identity.dedup_key())
        {
            if !state.record_notification(&key) {
                tracing::info!(path = %registration.path, %key, "duplicate Airtable ping");
                return Ok(());
            }
            state.write_into(&mut config);
            if let Err(e) = self
                .webhooks
                .update_provider_config(&registration.id, &config)
                .await
            {
                tracing::warn!(
                    path = %registration.path,
                    error = %e,
                    "failed to persist notification ring"
                );
            }
        } else if state.cursor == CursorField::Missing {
            // Repair a config written before cursor tracking existed.
            state.write_into(&mut config);
            state.cursor = CursorField::Null;
            if let Err(e) = self
                .webhooks
                .update_provider_config(&registration.id, &config)
                .await
            {
                tracing::warn!(path = %registration.path, error = %e, "failed to repair cursor field");
            }
        }

        let (Some(base_id), Some(webhook_id)) =
            (settings.base_id.as_deref(), settings.external_webhook_id.as_deref())
        else {
            self.ack_with_error(
                workflow,
                request_id,
                "Airtable registration is missing baseId or externalWebhookId",
            )
            .await;
            return Ok(());
        };

        let token = match self.secrets.access_token(&workflow.user_id, OAUTH_PROVIDER).await {
            Ok(token) => token,
            Err(e) => {
                let message = format!("failed to load Airtable access token: {e}");
                self.ack_with_error(workflow, request_id, &message).await;
                return Err(DispatchError::Execution(e.into()));
            }
        };
        let Some(token) = token else {
            self.ack_with_error(
                workflow,
                request_id,
                "no Airtable access token available for the workflow owner",
            )
            .await;
            return Ok(());
        };

        // Poll pages until the API is drained, the cursor stalls, an API
        // call fails, or the iteration cap is hit. Changes gathered before
        // a halt still execute.
        let mut consolidator = ChangeConsolidator::new();
        let mut cursor = state.cursor.value();
        let mut iterations = 0;

        while iterations < MAX_POLL_ITERATIONS {
            iterations += 1;
            let page = match self
                .airtable
                .list_payloads(base_id, webhook_id, cursor, &token)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        path = %registration.path,
                        error = %e,
                        "Airtable payloads call failed; halting poll"
                    );
                    self.ack_with_error(
                        workflow,
                        request_id,
                        &format!("Airtable payloads poll failed: {e}"),
                    )
                    .await;
                    break;
                }
            };

            for payload in &page.payloads {
                consolidator.absorb(payload);
            }

            match page.cursor {
                Some(new_cursor) if Some(new_cursor) != cursor => {
                    state.set_cursor(new_cursor);
                    state.write_into(&mut config);
                    // An unpersisted advance would replay or skip pages on
                    // the next ping, so this failure aborts the ping.
                    self.webhooks
                        .update_provider_config(&registration.id, &config)
                        .await
                        .map_err(DispatchError::CursorPersist)?;
                    cursor = Some(new_cursor);

                    if !page.might_have_more {
                        break;
                    }
                }
                // Missing or stalled cursor: nothing further to page through.
                _ => break,
            }
        }
        if iterations == MAX_POLL_ITERATIONS {
            tracing::warn!(
                path = %registration.path,
                "Airtable poll hit the iteration cap"
            );
        }

        if consolidator.is_empty() {
            tracing::debug!(path = %registration.path, "Airtable ping produced no changes");
            return Ok(());
        }

        let changes = consolidator.into_changes();
        tracing::info!(
            path = %registration.path,
            workflow_id = %workflow.id,
            change_count = changes.len(),
            "executing workflow for consolidated Airtable changes"
        );
        let input = json!({ "airtableChanges": changes });

        // One execution per ping; the request id doubles as the execution
        // id so the batch traces back to its inbound ping.
        self.execute_workflow(workflow, input, request_id, request_id)
            .await?;
        Ok(())
    }

    /// Persist a structured error without failing the ping.
    async fn ack_with_error(&self, workflow: &WorkflowDefinition, request_id: &str, message: &str) {
        if let Err(e) = self
            .logs
            .persist_error(&workflow.id, request_id, message, TriggerType::Webhook)
            .await
        {
            tracing::error!(
                workflow_id = %workflow.id,
                error = %e,
                "failed to persist Airtable error"
            );
        }
    }
}
