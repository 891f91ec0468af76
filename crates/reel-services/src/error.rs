//! Service client error types.

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx reply. `message` is the error text found in the body, if any.
    #[error("{service} returned HTTP {status}: {message} (body: {body})")]
    Http {
        service: &'static str,
        status: u16,
        message: String,
        body: String,
    },

    /// The request never produced a response.
    #[error("{service} request failed [{code}]: {message}")]
    Transport {
        service: &'static str,
        code: &'static str,
        message: String,
    },

    #[error("{service} returned a malformed response: {message}")]
    MalformedResponse { service: &'static str, message: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(service: &'static str, msg: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service,
            message: msg.into(),
        }
    }

    /// Classify a reqwest failure that happened before any response arrived.
    pub fn transport(service: &'static str, err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_body() {
            "body"
        } else if err.is_decode() {
            "decode"
        } else if err.is_request() {
            "request"
        } else {
            "unknown"
        };
        Self::Transport {
            service,
            code,
            message: err.to_string(),
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } | Self::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_message_carries_status_and_body() {
        let err = ServiceError::Http {
            service: "publisher",
            status: 500,
            message: "quota exceeded".into(),
            body: r#"{"error":"quota exceeded"}"#.into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("quota exceeded"));
        assert!(msg.contains(r#"{"error":"quota exceeded"}"#));
    }

    #[test]
    fn test_retryable_classification() {
        let server = ServiceError::Http {
            service: "x",
            status: 503,
            message: String::new(),
            body: String::new(),
        };
        let client = ServiceError::Http {
            service: "x",
            status: 400,
            message: String::new(),
            body: String::new(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!ServiceError::malformed("x", "no id").is_retryable());
    }
}
