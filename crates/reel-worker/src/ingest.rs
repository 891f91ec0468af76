//! Ingest worker.
//!
//! A single polling loop drains the import queue in creation order. The
//! worker's claim slot holds the one request in flight; a tick that finds it
//! occupied does nothing.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use reel_media::{extension_of, scratch_path};
use reel_models::{ImportRequest, ImportRequestId, ImportStatus, ImportUpdate, Video, VideoSource, VideoUpdate};
use serde_json::json;
use tokio::sync::watch;
use tracing::{error, info, Instrument};

use crate::context::PipelineContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics::record_ingest;
use crate::processor::VideoProcessor;

pub struct IngestWorker {
    ctx: PipelineContext,
    processor: VideoProcessor,
    slot: Mutex<ClaimSlot>,
}

#[derive(Debug, Default)]
enum ClaimSlot {
    #[default]
    Empty,
    /// A claim query is in progress.
    Claiming,
    Held(ImportRequestId),
}

/// Empties the claim slot when dropped.
struct ClaimGuard<'a> {
    slot: &'a Mutex<ClaimSlot>,
}

impl ClaimGuard<'_> {
    fn hold(&self, id: ImportRequestId) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = ClaimSlot::Held(id);
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = ClaimSlot::Empty;
    }
}

impl IngestWorker {
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            processor: VideoProcessor::new(ctx.clone()),
            ctx,
            slot: Mutex::new(ClaimSlot::Empty),
        }
    }

    /// The request currently being processed, if any.
    pub fn in_flight(&self) -> Option<ImportRequestId> {
        match &*self.slot.lock().unwrap_or_else(PoisonError::into_inner) {
            ClaimSlot::Held(id) => Some(id.clone()),
            _ => None,
        }
    }

    fn try_reserve(&self) -> Option<ClaimGuard<'_>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match *slot {
            ClaimSlot::Empty => {
                *slot = ClaimSlot::Claiming;
                Some(ClaimGuard { slot: &self.slot })
            }
            _ => None,
        }
    }

    /// Poll until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.ctx.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            "Ingest worker started (poll interval {:?})",
            self.ctx.config.poll_interval
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Ingest tick failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Ingest worker stopped");
    }

    /// Claim and fully process at most one queued request.
    ///
    /// Returns the id of the processed request. Failures of the item itself
    /// are recorded on the request and do not surface here.
    pub async fn tick(&self) -> WorkerResult<Option<ImportRequestId>> {
        let Some(guard) = self.try_reserve() else {
            return Ok(None);
        };
        let Some(request) = self.ctx.imports.claim_next_queued().await? else {
            return Ok(None);
        };
        guard.hold(request.id.clone());

        let id = request.id.clone();
        let logger = JobLogger::new(id.as_str(), "ingest");
        let span = logger.create_span();
        self.process(request, &logger).instrument(span).await;
        Ok(Some(id))
    }

    async fn process(&self, request: ImportRequest, logger: &JobLogger) {
        logger.log_start(&format!("{} from {}", request.source_name, request.provider));

        let local_path = match self.download(&request, logger).await {
            Ok(path) => path,
            Err(e) => {
                self.fail(&request, &e, None, logger).await;
                return;
            }
        };

        match self.ingest(&request, &local_path, logger).await {
            Ok(()) => {
                record_ingest(true);
                logger.log_completion("ready");
            }
            Err((e, video)) => self.fail(&request, &e, video, logger).await,
        }
    }

    async fn download(&self, request: &ImportRequest, logger: &JobLogger) -> WorkerResult<PathBuf> {
        let connection = self
            .ctx
            .connections
            .get_connection(&request.user_id, request.provider)
            .await?
            .ok_or_else(|| {
                WorkerError::download_failed(format!("no {} account connected for this user", request.provider))
            })?;

        let link = self
            .ctx
            .cloud
            .temporary_download_link(&connection.access_token, &request.source_path)
            .await?;

        let work_dir = &self.ctx.config.work_dir;
        tokio::fs::create_dir_all(work_dir).await?;
        let dest = scratch_path(work_dir, "import", request.id.as_str(), &extension_of(&request.source_name));

        let limit = self.ctx.config.download_timeout;
        let outcome = tokio::time::timeout(limit, self.ctx.cloud.download_to_file(&link, &dest)).await;
        let bytes = match outcome {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                remove_partial(&dest).await;
                return Err(e.into());
            }
            Err(_) => {
                remove_partial(&dest).await;
                return Err(WorkerError::timeout("download", limit));
            }
        };

        logger.log_progress(&format!("downloaded {} bytes", bytes));
        Ok(dest)
    }

    /// Everything after the download. On error, also returns the video to fail if one was created.
    async fn ingest(
        &self,
        request: &ImportRequest,
        local_path: &std::path::Path,
        logger: &JobLogger,
    ) -> Result<(), (WorkerError, Option<Video>)> {
        let local = local_path.to_string_lossy().into_owned();
        let imports = &self.ctx.imports;

        imports
            .update_import(
                &request.id,
                &ImportUpdate::status(ImportStatus::Processing)
                    .with_local_path(local.clone())
                    .with_progress(json!({"stage": "processing"})),
            )
            .await
            .map_err(|e| (WorkerError::from(e), None))?;

        let mut video = Video::new(request.user_id.clone(), local, VideoSource::CloudImport);
        if let Some(stem) = std::path::Path::new(&request.source_name).file_stem() {
            video.title = Some(stem.to_string_lossy().into_owned());
        }
        self.ctx
            .videos
            .create_video(&video)
            .await
            .map_err(|e| (WorkerError::from(e), None))?;
        logger.log_progress(&format!("created video {}", video.id));

        imports
            .update_import(&request.id, &ImportUpdate::default().with_video_id(video.id.clone()))
            .await
            .map_err(|e| (WorkerError::from(e), Some(video.clone())))?;

        imports
            .update_import(
                &request.id,
                &ImportUpdate::status(ImportStatus::Transcribing).with_progress(json!({"stage": "transcribing"})),
            )
            .await
            .map_err(|e| (WorkerError::from(e), Some(video.clone())))?;

        self.processor
            .process(&video.id)
            .await
            .map_err(|e| (e, Some(video.clone())))?;

        imports
            .update_import(
                &request.id,
                &ImportUpdate::status(ImportStatus::Ready).with_progress(json!({"stage": "ready"})),
            )
            .await
            .map_err(|e| (WorkerError::from(e), None))?;
        Ok(())
    }

    async fn fail(&self, request: &ImportRequest, err: &WorkerError, video: Option<Video>, logger: &JobLogger) {
        record_ingest(false);
        logger.log_error(&err.to_string());

        if let Err(e) = self
            .ctx
            .imports
            .update_import(&request.id, &ImportUpdate::failed(err.to_string()))
            .await
        {
            logger.log_warning(&format!("could not mark import failed: {}", e));
        }
        if let Some(video) = video {
            if let Err(e) = self
                .ctx
                .videos
                .update_video(&video.id, &VideoUpdate::failed(err.to_string()))
                .await
            {
                logger.log_warning(&format!("could not mark video failed: {}", e));
            }
        }
    }
}

async fn remove_partial(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove partial download {}: {}", path.display(), e);
        }
    }
}
