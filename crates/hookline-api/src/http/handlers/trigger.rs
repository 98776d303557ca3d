//! Webhook trigger handlers.
//!
//! `GET /api/v1/webhooks/trigger/{*path}` answers provider verification
//! probes (Meta `hub.*` handshakes and plain liveness checks). `POST` is
//! the delivery path: the body and headers are handed to the dispatcher,
//! which owns authentication, deduplication and workflow execution.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use hookline_core::dispatch::{DispatchBody, DispatchError, DispatchResponse, VerificationQuery};
use hookline_types::webhook::HeaderSnapshot;

use crate::state::AppState;

/// The `hub.*` query parameters sent by Meta-style verification probes.
#[derive(Debug, Deserialize)]
pub struct VerificationParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

impl From<VerificationParams> for VerificationQuery {
    fn from(params: VerificationParams) -> Self {
        VerificationQuery {
            mode: params.mode,
            verify_token: params.verify_token,
            challenge: params.challenge,
        }
    }
}

/// Dispatcher failure surfaced to the HTTP client as a 500.
pub struct TriggerError(DispatchError);

impl From<DispatchError> for TriggerError {
    fn from(e: DispatchError) -> Self {
        Self(e)
    }
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "webhook dispatch failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal Server Error: {}", self.0),
        )
            .into_response()
    }
}

/// Lowercased header map handed to the dispatcher. Values that are not
/// valid UTF-8 are dropped; none of the recognized provider headers are.
fn header_snapshot(headers: &HeaderMap) -> HeaderSnapshot {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn to_http_response(response: DispatchResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match response.body {
        DispatchBody::Text(text) => (status, text).into_response(),
        DispatchBody::Json(value) => (status, Json(value)).into_response(),
    }
}

/// GET /api/v1/webhooks/trigger/{*path} - Verification probe.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<VerificationParams>,
) -> Result<Response, TriggerError> {
    let response = state.dispatcher.verify(&path, &params.into()).await?;
    Ok(to_http_response(response))
}

/// POST /api/v1/webhooks/trigger/{*path} - Webhook delivery.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, TriggerError> {
    let snapshot = header_snapshot(&headers);
    let raw_body = String::from_utf8_lossy(&body);

    let response = state.dispatcher.deliver(&path, &snapshot, &raw_body).await?;
    Ok(to_http_response(response))
}
