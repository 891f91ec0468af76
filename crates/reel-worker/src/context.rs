//! Shared dependencies for the orchestrators.

use std::sync::Arc;

use reel_media::MediaTool;
use reel_models::{Video, VideoId};
use reel_services::{CloudStorageClient, CompletionClient, Publisher, Transcriber};
use reel_storage::MediaUrlResolver;
use reel_store::{ConnectionStore, ImportStore, VideoStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Everything a pipeline stage talks to, behind trait objects.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<WorkerConfig>,
    pub videos: Arc<dyn VideoStore>,
    pub imports: Arc<dyn ImportStore>,
    pub connections: Arc<dyn ConnectionStore>,
    pub media: Arc<dyn MediaTool>,
    pub media_urls: Arc<dyn MediaUrlResolver>,
    pub transcriber: Arc<dyn Transcriber>,
    pub llm: Arc<dyn CompletionClient>,
    pub publisher: Arc<dyn Publisher>,
    pub cloud: Arc<dyn CloudStorageClient>,
}

impl PipelineContext {
    pub async fn load_video(&self, id: &VideoId) -> WorkerResult<Video> {
        self.videos
            .get_video(id)
            .await?
            .ok_or_else(|| WorkerError::not_found(format!("Video {}", id)))
    }
}
