// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Swapmart

//! Inbound provider webhook endpoint.
//!
//! The handler takes the raw body bytes (before any JSON parsing) so the
//! signature is verified over exactly the byte stream the provider signed.
//! Responses: 200 for accept-or-duplicate-or-ignored (anything else makes
//! the provider retry), 401 for a failed signature check, 500 for storage
//! failures worth a retry.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::payments::WebhookOutcome;
use crate::provider::{verify_signature, WebhookEnvelope, SIGNATURE_HEADER};
use crate::state::AppState;

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    /// `processed`, `duplicate` or `ignored`.
    pub status: String,
}

/// Webhook health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookHealthResponse {
    pub status: String,
    /// Current server time, RFC 3339.
    pub timestamp: String,
}

/// Receive and process a provider webhook event.
#[utoipa::path(
    post,
    path = "/webhooks/provider",
    tag = "Webhooks",
    request_body(
        content = String,
        description = "Raw JSON event envelope. The signature in `X-Signature` \
                       is verified over these exact bytes before parsing."
    ),
    responses(
        (status = 200, description = "Event accepted (processed, duplicate or ignored)", body = WebhookAck),
        (status = 401, description = "Signature verification failed"),
        (status = 500, description = "Storage failure; provider should retry")
    )
)]
pub async fn provider_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            warn!("webhook rejected: missing signature header");
            ApiError::unauthorized("Missing signature header")
        })?;

    if !verify_signature(state.webhook_secret(), &body, signature) {
        warn!("webhook rejected: signature mismatch");
        return Err(ApiError::unauthorized("Invalid signature"));
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            // Signed but unparseable. Retrying will not improve it, so
            // acknowledge and keep the payload out of the ledger.
            error!(error = %e, "webhook body failed to parse, ignoring");
            return Ok(Json(WebhookAck {
                status: "ignored".to_string(),
            }));
        }
    };

    let outcome = state.processor().process_event(&envelope).map_err(|e| {
        error!(reference = %envelope.data.reference, error = %e, "webhook processing failed");
        ApiError::internal("Webhook processing failed")
    })?;

    let status = match outcome {
        WebhookOutcome::Processed => "processed",
        WebhookOutcome::Duplicate => "duplicate",
        WebhookOutcome::Ignored => "ignored",
    };
    Ok(Json(WebhookAck {
        status: status.to_string(),
    }))
}

/// Webhook liveness probe for the provider dashboard.
#[utoipa::path(
    get,
    path = "/webhooks/provider/health",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Webhook endpoint is alive", body = WebhookHealthResponse)
    )
)]
pub async fn webhook_health() -> Json<WebhookHealthResponse> {
    Json(WebhookHealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
