//! Router-level test fixtures.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use reel_media::{MediaResult, MediaTool};
use reel_models::{CloudConnection, CloudFile, CloudProvider, Video, VideoSource, VideoStatus};
use reel_services::{
    CloudStorageClient, CompletionClient, PublishSubmission, PublishedVideo, Publisher, ServiceResult, Transcriber,
    Transcription,
};
use reel_storage::{MediaUrlResolver, StorageResult};
use reel_store::{ConnectionStore, MemoryStore, VideoStore};
use reel_worker::{PipelineContext, WorkerConfig};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::USER_ID_HEADER;
use crate::config::ApiConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// One stand-in for every external dependency.
pub struct StubBackend {
    pub llm_reply: Mutex<String>,
}

#[async_trait]
impl MediaTool for StubBackend {
    async fn probe_duration_ms(&self, _path: &Path) -> Option<u64> {
        Some(60_000)
    }

    async fn trim(&self, input: &Path, output: &Path, _start_ms: u64, _end_ms: Option<u64>) -> MediaResult<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn thumbnail(&self, _input: &Path, output: &Path, _duration_ms: Option<u64>) -> MediaResult<()> {
        tokio::fs::write(output, b"jpeg").await?;
        Ok(())
    }
}

#[async_trait]
impl MediaUrlResolver for StubBackend {
    async fn public_url(&self, _local_path: &Path, key: &str) -> StorageResult<String> {
        Ok(format!("https://media.test/{}", key))
    }
}

#[async_trait]
impl Transcriber for StubBackend {
    async fn transcribe(&self, _media_url: &str, _language: &str) -> ServiceResult<Transcription> {
        Ok(Transcription {
            text: "hello from the stub".into(),
            captions: String::new(),
        })
    }
}

#[async_trait]
impl CompletionClient for StubBackend {
    async fn complete(&self, _prompt: &str) -> ServiceResult<String> {
        Ok(self.llm_reply.lock().unwrap().clone())
    }
}

#[async_trait]
impl Publisher for StubBackend {
    async fn publish(&self, _submission: &PublishSubmission) -> ServiceResult<PublishedVideo> {
        Ok(PublishedVideo {
            video_id: "platform-1".into(),
            url: None,
        })
    }
}

#[async_trait]
impl CloudStorageClient for StubBackend {
    async fn temporary_download_link(&self, _access_token: &str, path: &str) -> ServiceResult<String> {
        Ok(format!("https://dl.test{}", path))
    }

    async fn list_files(&self, access_token: &str, path: &str) -> ServiceResult<Vec<CloudFile>> {
        assert_eq!(access_token, "tok");
        Ok(vec![CloudFile {
            path: format!("{}/talk.mp4", path),
            name: "talk.mp4".into(),
            size: 10,
        }])
    }

    async fn download_to_file(&self, _url: &str, dest: &Path) -> ServiceResult<u64> {
        tokio::fs::write(dest, b"data").await?;
        Ok(4)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub backend: Arc<StubBackend>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(StubBackend {
            llm_reply: Mutex::new("{}".into()),
        });
        let ctx = PipelineContext {
            config: Arc::new(WorkerConfig {
                work_dir: dir.path().join("work"),
                ..WorkerConfig::default()
            }),
            videos: store.clone(),
            imports: store.clone(),
            connections: store.clone(),
            media: backend.clone(),
            media_urls: backend.clone(),
            transcriber: backend.clone(),
            llm: backend.clone(),
            publisher: backend.clone(),
            cloud: backend.clone(),
        };
        let state = AppState::new(ApiConfig::default(), ctx, None);

        Self {
            router: create_router(state, None),
            store,
            backend,
            dir,
        }
    }

    /// Send a request as `user` and return the status and body text.
    pub async fn send(&self, user: Option<&str>, request: Request<Body>) -> (StatusCode, String) {
        let mut request = request;
        if let Some(user) = user {
            request
                .headers_mut()
                .insert(USER_ID_HEADER, user.parse().unwrap());
        }
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn json(&self, user: &str, method: &str, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, text) = self.send(Some(user), request).await;
        (status, serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    pub async fn get(&self, user: &str, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(Some(user), request).await
    }

    pub async fn seed_video(&self, user: &str, status: VideoStatus) -> Video {
        let mut video = Video::new(user, "", VideoSource::Upload);
        let path = self.dir.path().join(format!("{}.mp4", video.id));
        tokio::fs::write(&path, b"media").await.unwrap();
        video.storage_path = path.to_string_lossy().into_owned();
        video.status = status;
        video.duration_ms = Some(60_000);
        video.transcript = Some("1\n00:00:01,000 --> 00:00:04,000\nhello\n".into());
        self.store.create_video(&video).await.unwrap();
        video
    }

    pub async fn connect(&self, user: &str) {
        self.store
            .save_connection(&CloudConnection {
                user_id: user.into(),
                provider: CloudProvider::Dropbox,
                access_token: "tok".into(),
                account_id: None,
                connected_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
    }

    /// Poll until the video reaches `status`.
    pub async fn wait_for_status(&self, video: &reel_models::VideoId, status: VideoStatus) -> Video {
        for _ in 0..200 {
            let current = self.store.get_video(video).await.unwrap().unwrap();
            if current.status == status {
                return current;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("video {} never reached {}", video, status);
    }
}
