//! Transcription service client.
//!
//! `POST {base}/transcribe {url, language}` answers `{text, captions}`, where
//! `captions` is an SRT track. Either may be empty but not both.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::http::check_status;

const SERVICE: &str = "transcription";

/// What the transcription service produced for one media URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub captions: String,
}

impl Transcription {
    /// The transcript to store: captions when present, plain text otherwise.
    pub fn best(&self) -> Option<&str> {
        [self.captions.as_str(), self.text.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media_url: &str, language: &str) -> ServiceResult<Transcription>;
}

#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            api_key: None,
            timeout: Duration::from_secs(900),
        }
    }
}

impl TranscriptionConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TRANSCRIPTION_URL").unwrap_or_else(|_| "http://localhost:8001".to_string()),
            api_key: std::env::var("TRANSCRIPTION_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(
                std::env::var("TRANSCRIPTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    url: &'a str,
    language: &'a str,
}

/// HTTP implementation of [`Transcriber`].
pub struct HttpTranscriber {
    http: Client,
    config: TranscriptionConfig,
}

impl HttpTranscriber {
    pub fn new(config: TranscriptionConfig) -> ServiceResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ServiceResult<Self> {
        Self::new(TranscriptionConfig::from_env())
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, media_url: &str, language: &str) -> ServiceResult<Transcription> {
        let url = format!("{}/transcribe", self.config.base_url.trim_end_matches('/'));
        debug!("Submitting media for transcription to {}", url);

        let mut request = self.http.post(&url).json(&TranscribeRequest {
            url: media_url,
            language,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| ServiceError::transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let body = response.text().await.map_err(|e| ServiceError::transport(SERVICE, e))?;
        let transcription: Transcription =
            serde_json::from_str(&body).map_err(|e| ServiceError::malformed(SERVICE, e.to_string()))?;

        info!(
            text_chars = transcription.text.len(),
            caption_chars = transcription.captions.len(),
            "Transcription received"
        );
        Ok(transcription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, api_key: Option<&str>) -> HttpTranscriber {
        HttpTranscriber::new(TranscriptionConfig {
            base_url: server.uri(),
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_captions_win_over_text() {
        let t = Transcription {
            text: "hello".into(),
            captions: "1\n00:00:00,000 --> 00:00:01,000\nhello\n".into(),
        };
        assert!(t.best().unwrap().contains("-->"));

        let text_only = Transcription {
            text: "hello".into(),
            captions: "  ".into(),
        };
        assert_eq!(text_only.best(), Some("hello"));
        assert_eq!(Transcription::default().best(), None);
    }

    #[tokio::test]
    async fn test_transcribe_posts_url_and_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(serde_json::json!({"url": "https://media/x.mp4", "language": "en"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "hi there",
                "captions": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server, Some("secret"))
            .transcribe("https://media/x.mp4", "en")
            .await
            .unwrap();
        assert_eq!(result.best(), Some("hi there"));
    }

    #[tokio::test]
    async fn test_missing_fields_decode_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let result = client(&server, None).transcribe("u", "en").await.unwrap();
        assert_eq!(result.best(), None);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({"detail": "model offline"})))
            .mount(&server)
            .await;

        let err = client(&server, None).transcribe("u", "en").await.unwrap_err();
        assert_eq!(err.http_status(), Some(502));
        assert!(err.to_string().contains("model offline"));
    }
}
