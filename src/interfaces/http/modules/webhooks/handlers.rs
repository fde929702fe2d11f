//! Payment provider webhook endpoint
//!
//! The single inbound door for provider events. The raw body is needed
//! for signature verification, so this handler takes `Bytes` instead
//! of a typed JSON extractor.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use tracing::{error, warn};

use super::signature::verify_signature;
use crate::application::payments::{WebhookDispatcher, WebhookEvent};
use crate::interfaces::http::common::ApiResponse;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Webhook handler state
#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<WebhookDispatcher>,
    /// Endpoint secret; empty disables verification (dev mode)
    pub webhook_secret: String,
    pub tolerance_secs: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payment",
    tag = "Webhooks",
    request_body = String,
    responses(
        (status = 200, description = "Event processed (success=false means business rejection; the provider must not retry)", body = ApiResponse<String>),
        (status = 400, description = "Bad signature or malformed payload"),
        (status = 500, description = "Processing failure; the provider should retry")
    )
)]
pub async fn receive_payment_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse<String>>) {
    if !state.webhook_secret.is_empty() {
        let Some(header) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("missing Stripe-Signature header")),
            );
        };

        if let Err(e) = verify_signature(
            &state.webhook_secret,
            header,
            &body,
            state.tolerance_secs,
            Utc::now().timestamp(),
        ) {
            warn!(error = %e, "Webhook signature rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("signature verification failed: {e}"))),
            );
        }
    }

    let event = match WebhookEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Unparseable webhook payload");
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())));
        }
    };

    match state.dispatcher.dispatch(event).await {
        // 200 either way: a business rejection is final and must not
        // be redelivered.
        Ok(outcome) if outcome.success => {
            (StatusCode::OK, Json(ApiResponse::success(outcome.message)))
        }
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::error(outcome.message))),
        // A propagated error means the event was NOT recorded as
        // processed; 500 makes the provider retry it.
        Err(e) => {
            error!(error = %e, "Webhook processing failed, awaiting provider retry");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("webhook processing failed")),
            )
        }
    }
}
