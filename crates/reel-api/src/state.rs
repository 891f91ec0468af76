//! Application state.

use std::sync::Arc;

use anyhow::Context;
use reel_media::FfmpegTool;
use reel_services::{DropboxClient, GeminiClient, HttpTranscriber, PublishClient};
use reel_storage::{FileUrlResolver, MediaUrlResolver, R2Client, R2MediaUrls};
use reel_store::{FirestoreStore, MemoryStore};
use reel_worker::{IngestWorker, PipelineContext, PublishOrchestrator, VideoProcessor, WorkerConfig};
use tracing::{info, warn};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub ctx: PipelineContext,
    pub processor: VideoProcessor,
    pub publisher: PublishOrchestrator,
    pub ingest: Arc<IngestWorker>,
    /// Present when media URLs come from R2.
    pub storage: Option<R2Client>,
}

impl AppState {
    pub fn new(config: ApiConfig, ctx: PipelineContext, storage: Option<R2Client>) -> Self {
        Self {
            config: Arc::new(config),
            processor: VideoProcessor::new(ctx.clone()),
            publisher: PublishOrchestrator::new(ctx.clone()),
            ingest: Arc::new(IngestWorker::new(ctx.clone())),
            ctx,
            storage,
        }
    }

    /// Wire every backend from the environment.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let worker_config = Arc::new(WorkerConfig::from_env());

        let backend = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string());
        let (videos, imports, connections): (
            Arc<dyn reel_store::VideoStore>,
            Arc<dyn reel_store::ImportStore>,
            Arc<dyn reel_store::ConnectionStore>,
        ) = match backend.as_str() {
            "firestore" => {
                let store = Arc::new(FirestoreStore::from_env().await.context("Firestore store")?);
                (store.clone(), store.clone(), store)
            }
            "memory" => {
                warn!("Using the in-memory store; records are lost on restart");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store.clone(), store)
            }
            other => anyhow::bail!("Unknown STORE_BACKEND '{}' (expected firestore or memory)", other),
        };

        let (media_urls, storage): (Arc<dyn MediaUrlResolver>, Option<R2Client>) = match R2Client::from_env() {
            Ok(client) => {
                info!("Serving media to the transcriber through R2");
                (
                    Arc::new(R2MediaUrls::new(client.clone(), worker_config.media_url_ttl)),
                    Some(client),
                )
            }
            Err(e) => {
                warn!("R2 not configured ({}); using file:// media URLs", e);
                (Arc::new(FileUrlResolver), None)
            }
        };

        let ctx = PipelineContext {
            config: worker_config,
            videos,
            imports,
            connections,
            media: Arc::new(FfmpegTool::default()),
            media_urls,
            transcriber: Arc::new(HttpTranscriber::from_env().context("transcription client")?),
            llm: Arc::new(GeminiClient::from_env().context("Gemini client")?),
            publisher: Arc::new(PublishClient::from_env().context("publish client")?),
            cloud: Arc::new(DropboxClient::from_env().context("Dropbox client")?),
        };

        Ok(Self::new(config, ctx, storage))
    }
}
