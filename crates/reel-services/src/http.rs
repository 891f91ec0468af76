//! Response handling shared by the clients.

use reqwest::Response;

use crate::error::{ServiceError, ServiceResult};

/// Pass 2xx responses through; turn anything else into [`ServiceError::Http`].
pub(crate) async fn check_status(service: &'static str, response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Http {
        service,
        status: status.as_u16(),
        message: error_text(&body).unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
        body,
    })
}

/// Pull a human-readable message out of a JSON error body.
///
/// Understands `{"error": "..."}`, `{"error": {"message": "..."}}`,
/// `{"message": "..."}`, `{"detail": "..."}` and Dropbox's `error_summary`.
pub(crate) fn error_text(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let pick = |v: &serde_json::Value| v.as_str().map(str::to_string);

    value
        .get("error")
        .and_then(|e| pick(e).or_else(|| e.get("message").and_then(pick)))
        .or_else(|| value.get("error_summary").and_then(pick))
        .or_else(|| value.get("message").and_then(pick))
        .or_else(|| value.get("detail").and_then(pick))
        .filter(|s| !s.is_empty())
}
