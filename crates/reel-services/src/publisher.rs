//! Publishing platform client.
//!
//! A submission is one multipart `POST {base}/videos` carrying the video
//! bytes, its metadata, and optionally a thumbnail and a caption track.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::http::check_status;

const SERVICE: &str = "publisher";

/// Where a thumbnail comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailSource {
    File(PathBuf),
    Url(String),
}

impl ThumbnailSource {
    /// `http(s)` references are fetched; anything else is a local path.
    pub fn from_reference(reference: &str) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            Self::Url(reference.to_string())
        } else {
            Self::File(PathBuf::from(reference))
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishSubmission {
    pub video_path: PathBuf,
    pub title: String,
    pub channel_id: String,
    pub description: String,
    pub tags: Vec<String>,
    pub privacy: String,
    pub thumbnail: Option<ThumbnailSource>,
    /// SRT track, already aligned with the submitted video.
    pub captions: Option<String>,
}

/// Platform identifiers for a published video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub video_id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, submission: &PublishSubmission) -> ServiceResult<PublishedVideo>;
}

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
}

impl PublishConfig {
    pub fn from_env() -> ServiceResult<Self> {
        Ok(Self {
            base_url: std::env::var("PUBLISH_URL").map_err(|_| ServiceError::config("PUBLISH_URL not set"))?,
            api_key: std::env::var("PUBLISH_API_KEY").ok().filter(|k| !k.is_empty()),
            connect_timeout: Duration::from_secs(10),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    #[serde(default = "default_success")]
    success: bool,
    video_id: Option<String>,
    url: Option<String>,
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

pub struct PublishClient {
    http: Client,
    config: PublishConfig,
}

impl PublishClient {
    /// The overall request deadline is left to the caller.
    pub fn new(config: PublishConfig) -> ServiceResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ServiceResult<Self> {
        Self::new(PublishConfig::from_env()?)
    }

    async fn file_part(path: &Path, mime: &str) -> ServiceResult<Part> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Part::stream_with_length(file, len)
            .file_name(name)
            .mime_str(mime)
            .map_err(|e| ServiceError::transport(SERVICE, e))
    }

    /// Thumbnail part, or `None` if it cannot be read or fetched.
    async fn thumbnail_part(&self, source: &ThumbnailSource) -> Option<Part> {
        match source {
            ThumbnailSource::File(path) => match Self::file_part(path, "image/jpeg").await {
                Ok(part) => Some(part),
                Err(e) => {
                    warn!("Skipping thumbnail {}: {}", path.display(), e);
                    None
                }
            },
            ThumbnailSource::Url(url) => {
                let fetched = async {
                    let response = self.http.get(url).send().await?.error_for_status()?;
                    response.bytes().await
                }
                .await;
                match fetched {
                    Ok(bytes) => Some(Part::bytes(bytes.to_vec()).file_name("thumbnail.jpg")),
                    Err(e) => {
                        warn!("Skipping thumbnail {}: {}", url, e);
                        None
                    }
                }
            }
        }
    }

    async fn build_form(&self, submission: &PublishSubmission) -> ServiceResult<Form> {
        let mut form = Form::new()
            .part("video", Self::file_part(&submission.video_path, "video/mp4").await?)
            .text("title", submission.title.clone())
            .text("channel_id", submission.channel_id.clone())
            .text("description", submission.description.clone())
            .text("tags", serde_json::to_string(&submission.tags)?)
            .text("privacy", submission.privacy.clone());

        if let Some(source) = &submission.thumbnail {
            if let Some(part) = self.thumbnail_part(source).await {
                form = form.part("thumbnail", part);
            }
        }
        if let Some(captions) = &submission.captions {
            let part = Part::text(captions.clone())
                .file_name("captions.srt")
                .mime_str("application/x-subrip")
                .map_err(|e| ServiceError::transport(SERVICE, e))?;
            form = form.part("captions", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl Publisher for PublishClient {
    async fn publish(&self, submission: &PublishSubmission) -> ServiceResult<PublishedVideo> {
        let url = format!("{}/videos", self.config.base_url.trim_end_matches('/'));
        let form = self.build_form(submission).await?;
        debug!(channel_id = %submission.channel_id, "Submitting video to {}", url);

        let mut request = self.http.post(&url).multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| ServiceError::transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let body = response.text().await.map_err(|e| ServiceError::transport(SERVICE, e))?;
        let parsed: PublishResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::malformed(SERVICE, format!("{} (body: {})", e, body)))?;

        if !parsed.success {
            return Err(ServiceError::malformed(
                SERVICE,
                format!(
                    "platform reported failure: {} (body: {})",
                    parsed.error.as_deref().unwrap_or("no error text"),
                    body
                ),
            ));
        }
        let video_id = parsed
            .video_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::malformed(SERVICE, format!("missing video_id (body: {})", body)))?;

        info!(platform_video_id = %video_id, "Video published");
        Ok(PublishedVideo {
            video_id,
            url: parsed.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn client(server: &MockServer) -> PublishClient {
        PublishClient::new(PublishConfig {
            base_url: server.uri(),
            api_key: Some("pk".into()),
            connect_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    async fn submission(dir: &Path) -> PublishSubmission {
        let video_path = dir.join("video.mp4");
        tokio::fs::write(&video_path, b"fake video bytes").await.unwrap();
        PublishSubmission {
            video_path,
            title: "Launch day".into(),
            channel_id: "chan-1".into(),
            description: "desc".into(),
            tags: vec!["launch".into(), "demo".into()],
            privacy: "private".into(),
            thumbnail: None,
            captions: Some("1\n00:00:00,000 --> 00:00:01,000\nhi\n".into()),
        }
    }

    fn body_of(request: &Request) -> String {
        String::from_utf8_lossy(&request.body).into_owned()
    }

    #[test]
    fn test_thumbnail_reference_kinds() {
        assert_eq!(
            ThumbnailSource::from_reference("https://cdn/x.jpg"),
            ThumbnailSource::Url("https://cdn/x.jpg".into())
        );
        assert_eq!(
            ThumbnailSource::from_reference("/tmp/thumb.jpg"),
            ThumbnailSource::File(PathBuf::from("/tmp/thumb.jpg"))
        );
    }

    #[tokio::test]
    async fn test_publish_sends_all_parts() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/videos"))
            .and(header("authorization", "Bearer pk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "video_id": "yt-123",
                "url": "https://video.example/yt-123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let published = client(&server).publish(&submission(dir.path()).await).await.unwrap();
        assert_eq!(published.video_id, "yt-123");
        assert_eq!(published.url.as_deref(), Some("https://video.example/yt-123"));

        let received = server.received_requests().await.unwrap();
        let body = body_of(&received[0]);
        for part in ["\"video\"", "\"title\"", "\"channel_id\"", "\"description\"", "\"tags\"", "\"privacy\"", "\"captions\""] {
            assert!(body.contains(&format!("name={}", part)), "missing part {}", part);
        }
        assert!(body.contains("fake video bytes"));
        assert!(!body.contains("name=\"thumbnail\""));
    }

    #[tokio::test]
    async fn test_remote_thumbnail_is_fetched() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        Mock::given(method("GET"))
            .and(path("/thumb.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"JPEGDATA".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true, "video_id": "v"})))
            .mount(&server)
            .await;

        let mut sub = submission(dir.path()).await;
        sub.thumbnail = Some(ThumbnailSource::Url(format!("{}/thumb.jpg", server.uri())));
        client(&server).publish(&sub).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let post = received.iter().find(|r| r.method.as_str() == "POST").unwrap();
        let body = body_of(post);
        assert!(body.contains("name=\"thumbnail\""));
        assert!(body.contains("JPEGDATA"));
    }

    #[tokio::test]
    async fn test_server_error_message_has_status_and_error_text() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "upload quota exceeded"})))
            .mount(&server)
            .await;

        let err = client(&server).publish(&submission(dir.path()).await).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"), "{}", msg);
        assert!(msg.contains("upload quota exceeded"), "{}", msg);
    }

    #[tokio::test]
    async fn test_success_without_video_id_is_malformed() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .mount(&server)
            .await;

        let err = client(&server).publish(&submission(dir.path()).await).await.unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_missing_video_file_fails_before_sending() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut sub = submission(dir.path()).await;
        sub.video_path = dir.path().join("gone.mp4");

        let err = client(&server).publish(&sub).await.unwrap_err();
        assert!(matches!(err, ServiceError::Io(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
