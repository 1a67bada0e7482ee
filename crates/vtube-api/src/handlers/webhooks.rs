//! Mux webhook dispatcher.
//!
//! The single entry point for provider lifecycle notifications. The raw
//! body bytes are carried untouched from extraction to signature
//! verification — parsing first and re-serializing would change the byte
//! sequence the signature was computed over.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use tracing::{info, warn};

use vtube_webhook::{classify, WebhookError, SIGNATURE_HEADER};

use crate::error::ApiResult;
use crate::metrics::record_webhook_event;
use crate::state::AppState;

/// Handle a provider webhook delivery.
///
/// Responses: 200 handled or unhandled-but-accepted, 400 invalid signature /
/// malformed event / unknown correlation id, 401 unsigned, 500 mirror or
/// store failure. Failures are terminal for the delivery; the provider's
/// redelivery is the only retry.
pub async fn mux_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<&'static str> {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        warn!("Webhook delivery without signature header");
        record_webhook_event("unknown", "unauthenticated");
        return Err(WebhookError::Unauthenticated.into());
    };

    if let Err(e) = state.verifier.verify(&body, signature) {
        warn!("Webhook signature rejected: {}", e);
        record_webhook_event("unknown", "invalid_signature");
        return Err(e.into());
    }

    let event = match classify(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Malformed webhook event: {}", e);
            record_webhook_event("unknown", "malformed");
            return Err(e.into());
        }
    };

    match state.reconciler.apply(&event).await {
        Ok(outcome) => {
            info!(event = event.kind(), outcome = outcome.as_str(), "Webhook processed");
            record_webhook_event(event.kind(), outcome.as_str());
            Ok("webhook processed")
        }
        Err(e) => {
            warn!(event = event.kind(), "Webhook reconciliation failed: {}", e);
            record_webhook_event(event.kind(), "error");
            Err(e.into())
        }
    }
}
