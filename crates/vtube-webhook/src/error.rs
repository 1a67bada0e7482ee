//! Webhook error taxonomy.
//!
//! Every variant maps to exactly one HTTP response in the dispatcher; no
//! webhook failure is retried within the request.

use thiserror::Error;

/// Result type for webhook processing.
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Errors that can occur while processing an inbound webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signature header on the request (maps to 401).
    #[error("No signature found")]
    Unauthenticated,

    /// Signature header present but unparsable, stale or wrong (maps to 400).
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Payload missing a required field for its event type (maps to 400).
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// No record matches the event's correlation id (maps to 400 — this is
    /// a server-to-server endpoint, not a resource lookup API).
    #[error("No video record found for {0}")]
    RecordNotFound(String),

    /// Mirroring a provider asset failed (maps to 500).
    #[error("Asset mirror failed: {0}")]
    Mirror(#[from] vtube_storage::StorageError),

    /// Record store failure (maps to 500).
    #[error("Store error: {0}")]
    Store(#[from] vtube_firestore::FirestoreError),
}

impl WebhookError {
    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        Self::InvalidSignature(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::RecordNotFound(key.into())
    }
}
