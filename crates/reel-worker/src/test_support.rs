//! In-process fakes for orchestrator tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reel_media::{MediaError, MediaResult, MediaTool};
use reel_models::{CloudFile, Video, VideoId, VideoSource, VideoStatus};
use reel_services::{
    CloudStorageClient, CompletionClient, PublishSubmission, PublishedVideo, Publisher, ServiceError, ServiceResult,
    Transcriber, Transcription,
};
use reel_storage::{MediaUrlResolver, StorageResult};
use reel_store::{MemoryStore, VideoStore};
use tempfile::TempDir;

use crate::config::WorkerConfig;
use crate::context::PipelineContext;

/// Text that only the content-boundary prompt contains.
pub const BOUNDARY_MARKER: &str = "substantive content";

pub struct FakeMedia {
    duration: Mutex<Option<u64>>,
    trims: Mutex<Vec<(u64, Option<u64>)>>,
    fail_trims: AtomicBool,
    fail_thumbnails: AtomicBool,
}

impl FakeMedia {
    fn new() -> Self {
        Self {
            duration: Mutex::new(Some(120_000)),
            trims: Mutex::new(Vec::new()),
            fail_trims: AtomicBool::new(false),
            fail_thumbnails: AtomicBool::new(false),
        }
    }

    pub fn set_duration(&self, duration: Option<u64>) {
        *self.duration.lock().unwrap() = duration;
    }

    pub fn fail_trims(&self) {
        self.fail_trims.store(true, Ordering::SeqCst);
    }

    pub fn fail_thumbnails(&self) {
        self.fail_thumbnails.store(true, Ordering::SeqCst);
    }

    pub fn trims(&self) -> Vec<(u64, Option<u64>)> {
        self.trims.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTool for FakeMedia {
    async fn probe_duration_ms(&self, _path: &Path) -> Option<u64> {
        *self.duration.lock().unwrap()
    }

    async fn trim(&self, input: &Path, output: &Path, start_ms: u64, end_ms: Option<u64>) -> MediaResult<()> {
        self.trims.lock().unwrap().push((start_ms, end_ms));
        if self.fail_trims.load(Ordering::SeqCst) {
            return Err(MediaError::ffmpeg_failed("trim failed", Some("moov atom not found".into()), Some(1)));
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn thumbnail(&self, _input: &Path, output: &Path, _duration_ms: Option<u64>) -> MediaResult<()> {
        if self.fail_thumbnails.load(Ordering::SeqCst) {
            return Err(MediaError::ffmpeg_failed("no frames", None, Some(1)));
        }
        tokio::fs::write(output, b"jpeg").await?;
        Ok(())
    }
}

pub struct FakeUrls;

#[async_trait]
impl MediaUrlResolver for FakeUrls {
    async fn public_url(&self, _local_path: &Path, key: &str) -> StorageResult<String> {
        Ok(format!("https://media.test/{}", key))
    }
}

#[derive(Default)]
pub struct FakeTranscriber {
    reply: Mutex<Transcription>,
    error: Mutex<Option<ServiceError>>,
    urls: Mutex<Vec<String>>,
}

impl FakeTranscriber {
    pub fn respond(&self, reply: Transcription) {
        *self.reply.lock().unwrap() = reply;
    }

    /// Fail the next call.
    pub fn fail_with(&self, error: ServiceError) {
        *self.error.lock().unwrap() = Some(error);
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, media_url: &str, _language: &str) -> ServiceResult<Transcription> {
        self.urls.lock().unwrap().push(media_url.to_string());
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.reply.lock().unwrap().clone())
    }
}

type Responder = Box<dyn Fn(&str) -> ServiceResult<String> + Send + Sync>;

pub struct FakeLlm {
    responder: Mutex<Responder>,
    pub calls: AtomicUsize,
}

impl FakeLlm {
    pub fn replying(f: impl Fn(&str) -> ServiceResult<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Mutex::new(Box::new(f)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, f: impl Fn(&str) -> ServiceResult<String> + Send + Sync + 'static) {
        *self.responder.lock().unwrap() = Box::new(f);
    }
}

#[async_trait]
impl CompletionClient for FakeLlm {
    async fn complete(&self, prompt: &str) -> ServiceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder.lock().unwrap())(prompt)
    }
}

#[derive(Default)]
pub struct FakePublisher {
    submissions: Mutex<Vec<PublishSubmission>>,
    error: Mutex<Option<ServiceError>>,
    delay: Mutex<Option<Duration>>,
}

impl FakePublisher {
    /// Fail the next submission.
    pub fn fail_with(&self, error: ServiceError) {
        *self.error.lock().unwrap() = Some(error);
    }

    pub fn succeed(&self) {
        *self.error.lock().unwrap() = None;
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn submissions(&self) -> Vec<PublishSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn last(&self) -> PublishSubmission {
        self.submissions().pop().expect("no submissions")
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, submission: &PublishSubmission) -> ServiceResult<PublishedVideo> {
        assert!(submission.video_path.exists(), "submitted media must exist");
        let count = {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push(submission.clone());
            submissions.len()
        };
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(PublishedVideo {
            video_id: format!("platform-{}", count),
            url: Some(format!("https://video.test/platform-{}", count)),
        })
    }
}

#[derive(Default)]
pub struct FakeCloud {
    downloaded: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeCloud {
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Source paths whose links were resolved, in order.
    pub fn downloaded(&self) -> Vec<String> {
        self.downloaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudStorageClient for FakeCloud {
    async fn temporary_download_link(&self, _access_token: &str, path: &str) -> ServiceResult<String> {
        if path.contains("broken") {
            return Err(ServiceError::Http {
                service: "dropbox",
                status: 409,
                message: format!("path/not_found: {}", path),
                body: String::new(),
            });
        }
        self.downloaded.lock().unwrap().push(path.to_string());
        Ok(format!("https://dl.test{}", path))
    }

    async fn list_files(&self, _access_token: &str, path: &str) -> ServiceResult<Vec<CloudFile>> {
        Ok(vec![CloudFile {
            path: format!("{}/a.mp4", path.trim_end_matches('/')),
            name: "a.mp4".into(),
            size: 4,
        }])
    }

    async fn download_to_file(&self, _url: &str, dest: &Path) -> ServiceResult<u64> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        tokio::fs::write(dest, b"data").await?;
        Ok(4)
    }
}

/// A [`PipelineContext`] wired to fakes and a [`MemoryStore`].
pub struct Harness {
    pub ctx: PipelineContext,
    pub store: Arc<MemoryStore>,
    pub media: Arc<FakeMedia>,
    pub transcriber: Arc<FakeTranscriber>,
    pub llm: Arc<FakeLlm>,
    pub publisher: Arc<FakePublisher>,
    pub cloud: Arc<FakeCloud>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_publish_timeout(limit: Duration) -> Self {
        Self::with_config(|c| c.publish_timeout = limit)
    }

    pub fn with_download_timeout(limit: Duration) -> Self {
        Self::with_config(|c| c.download_timeout = limit)
    }

    fn with_config(adjust: impl FnOnce(&mut WorkerConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorkerConfig {
            work_dir: dir.path().join("work"),
            ..WorkerConfig::default()
        };
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let media = Arc::new(FakeMedia::new());
        let transcriber = Arc::new(FakeTranscriber::default());
        let llm = Arc::new(FakeLlm::replying(|_| Ok("{\"title\": \"Generated title\"}".into())));
        let publisher = Arc::new(FakePublisher::default());
        let cloud = Arc::new(FakeCloud::default());

        let ctx = PipelineContext {
            config: Arc::new(config),
            videos: store.clone(),
            imports: store.clone(),
            connections: store.clone(),
            media: media.clone(),
            media_urls: Arc::new(FakeUrls),
            transcriber: transcriber.clone(),
            llm: llm.clone(),
            publisher: publisher.clone(),
            cloud: cloud.clone(),
        };

        Self {
            ctx,
            store,
            media,
            transcriber,
            llm,
            publisher,
            cloud,
            dir,
        }
    }

    /// A video for user `u1` in `status`, backed by a real file.
    pub async fn seed_video(&self, status: VideoStatus) -> Video {
        let id = VideoId::new();
        let path = self.dir.path().join(format!("source-{}.mp4", id));
        tokio::fs::write(&path, b"source media").await.unwrap();

        let mut video = Video::new("u1", path.to_string_lossy(), VideoSource::Upload);
        video.id = id;
        video.status = status;
        self.store.create_video(&video).await.unwrap();
        video
    }

    /// A two-minute `ready_to_edit` video with `transcript`.
    pub async fn seed_ready_video(&self, transcript: &str) -> Video {
        let mut video = Video::new("u1", "", VideoSource::Upload);
        let path = self.dir.path().join(format!("source-{}.mp4", video.id));
        tokio::fs::write(&path, b"source media").await.unwrap();

        video.storage_path = path.to_string_lossy().into_owned();
        video.status = VideoStatus::ReadyToEdit;
        video.transcript = Some(transcript.to_string());
        video.duration_ms = Some(120_000);
        self.store.create_video(&video).await.unwrap();
        video
    }

    pub async fn video(&self, id: &VideoId) -> Video {
        self.store.get_video(id).await.unwrap().unwrap()
    }

    pub async fn store_has(&self, id: &VideoId) -> bool {
        self.store.get_video(id).await.unwrap().is_some()
    }
}
