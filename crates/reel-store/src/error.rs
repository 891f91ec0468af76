//! Store error types.

use reel_models::ModelError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::AuthError(message),
            404 => Self::NotFound(message),
            409 => Self::AlreadyExists(message),
            412 => Self::PreconditionFailed(message),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, message),
            _ => Self::RequestFailed(message),
        }
    }

    /// HTTP status this error corresponds to, for metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::AlreadyExists(_) => Some(409),
            Self::PreconditionFailed(_) => Some(412),
            Self::RateLimited(_) => Some(429),
            Self::ServerError(status, _) => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-suggested backoff.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_) | StoreError::RateLimited(_) | StoreError::ServerError(_, _)
        )
    }

    /// True if the error was caused by a failed precondition (e.g., updateTime mismatch).
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, StoreError::PreconditionFailed(_))
            || matches!(
                self,
                StoreError::RequestFailed(msg)
                if msg.contains("FAILED_PRECONDITION")
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_http_status_429() {
        let err = StoreError::from_http_status(429, "rate limited");
        assert!(matches!(err, StoreError::RateLimited(_)));
        assert!(err.is_retryable());
        assert_eq!(err.retry_after_ms(), Some(1000));
    }

    #[test]
    fn test_error_from_http_status_503() {
        let err = StoreError::from_http_status(503, "service unavailable");
        assert!(matches!(err, StoreError::ServerError(503, _)));
        assert!(err.is_retryable());
        assert_eq!(err.http_status(), Some(503));
    }

    #[test]
    fn test_error_from_http_status_400() {
        let err = StoreError::from_http_status(400, "bad request");
        assert!(matches!(err, StoreError::RequestFailed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_precondition_detection() {
        assert!(StoreError::from_http_status(412, "stale").is_precondition_failed());
        assert!(StoreError::request_failed("FAILED_PRECONDITION: stale").is_precondition_failed());
        assert!(!StoreError::not_found("x").is_precondition_failed());
    }

    #[test]
    fn test_model_errors_are_not_retryable() {
        let err: StoreError = ModelError::AlreadySet("video_id").into();
        assert!(!err.is_retryable());
    }
}
