//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Transcription returned no text")]
    EmptyTranscript,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("{stage} timed out after {secs} seconds")]
    Timeout { stage: &'static str, secs: u64 },

    #[error("AI analysis failed: {0}")]
    AiFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    Store(#[from] reel_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] reel_storage::StorageError),

    #[error("{0}")]
    Service(#[from] reel_services::ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn timeout(stage: &'static str, limit: std::time::Duration) -> Self {
        Self::Timeout {
            stage,
            secs: limit.as_secs(),
        }
    }

    /// Whether a manual retry of the same item could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::DownloadFailed(_) | WorkerError::Timeout { .. } | WorkerError::Storage(_) => true,
            WorkerError::Service(e) => e.is_retryable(),
            WorkerError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Rejections caused by the caller rather than the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WorkerError::NotFound(_)
                | WorkerError::InvalidInput(_)
                | WorkerError::Store(reel_store::StoreError::Model(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_keep_their_message() {
        let err: WorkerError = reel_services::ServiceError::Http {
            service: "publisher",
            status: 500,
            message: "quota".into(),
            body: "{}".into(),
        }
        .into();
        assert_eq!(err.to_string(), "publisher returned HTTP 500: quota (body: {})");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classification() {
        assert!(!WorkerError::EmptyTranscript.is_retryable());
        assert!(WorkerError::timeout("download", std::time::Duration::from_secs(600)).is_retryable());
        assert!(WorkerError::invalid_input("end before start").is_client_error());
    }
}
