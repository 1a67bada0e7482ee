//! Firestore error types.

use thiserror::Error;

/// Result type for Firestore operations.
pub type FirestoreResult<T> = Result<T, FirestoreError>;

/// Errors that can occur during Firestore operations.
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map an HTTP status code to an error variant.
    pub fn from_http_status(status: u16, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match status {
            401 | 403 => Self::PermissionDenied(msg),
            404 => Self::NotFound(msg),
            412 | 409 => Self::PreconditionFailed(msg),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, msg),
            _ => Self::RequestFailed(msg),
        }
    }

    /// Check if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FirestoreError::Network(_)
                | FirestoreError::RateLimited(_)
                | FirestoreError::ServerError(_, _)
        )
    }

    /// Suggested delay before retrying, if the server provided one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            FirestoreError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FirestoreError::PermissionDenied(_) => Some(403),
            FirestoreError::NotFound(_) => Some(404),
            FirestoreError::PreconditionFailed(_) => Some(412),
            FirestoreError::RateLimited(_) => Some(429),
            FirestoreError::ServerError(status, _) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_429_is_retryable() {
        let err = FirestoreError::from_http_status(429, "rate limited");
        assert!(matches!(err, FirestoreError::RateLimited(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_http_status_5xx_is_retryable() {
        let err = FirestoreError::from_http_status(503, "unavailable");
        assert!(matches!(err, FirestoreError::ServerError(503, _)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_http_status_400_is_terminal() {
        let err = FirestoreError::from_http_status(400, "bad request");
        assert!(matches!(err, FirestoreError::RequestFailed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_precondition_mapping() {
        let err = FirestoreError::from_http_status(412, "stale");
        assert!(matches!(err, FirestoreError::PreconditionFailed(_)));
        assert_eq!(err.http_status(), Some(412));
    }
}
