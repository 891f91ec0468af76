//! Video processing orchestrator.
//!
//! Drives one video from `uploading` (or `failed`, on reprocess) through
//! transcription to `ready_to_edit`, then hands metadata generation to a
//! background task. Direct uploads and the ingest worker both come through
//! here.

use std::path::Path;

use reel_media::scratch_path;
use reel_models::{Video, VideoId, VideoStatus, VideoUpdate};
use reel_storage::media_key;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::context::PipelineContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metadata::spawn_metadata;
use crate::metrics::record_processing;

/// A video that reached `ready_to_edit`.
pub struct ProcessedVideo {
    pub video: Video,
    /// The detached metadata task. Dropping it does not cancel it.
    pub metadata: JoinHandle<()>,
}

#[derive(Clone)]
pub struct VideoProcessor {
    ctx: PipelineContext,
}

impl VideoProcessor {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Transcribe `video_id` and start metadata generation.
    ///
    /// Any failure before `ready_to_edit` is recorded on the video as
    /// `failed` with the error message, then returned.
    pub async fn process(&self, video_id: &VideoId) -> WorkerResult<ProcessedVideo> {
        let logger = JobLogger::new(video_id.as_str(), "video_processing");
        let span = logger.create_span();

        async {
            logger.log_start("transcription");
            match self.transcribe(video_id, &logger).await {
                Ok(video) => {
                    let video = self.ensure_thumbnail(video, &logger).await;
                    record_processing(true);
                    logger.log_completion("ready to edit");
                    Ok(ProcessedVideo {
                        metadata: spawn_metadata(self.ctx.clone(), video.id.clone()),
                        video,
                    })
                }
                Err(e) => {
                    record_processing(false);
                    logger.log_error(&e.to_string());
                    self.mark_failed(video_id, &e, &logger).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn transcribe(&self, video_id: &VideoId, logger: &JobLogger) -> WorkerResult<Video> {
        let video = self.ctx.load_video(video_id).await?;
        let media_path = Path::new(&video.storage_path);

        match self.ctx.media.probe_duration_ms(media_path).await {
            Some(duration_ms) => {
                self.ctx
                    .videos
                    .update_video(video_id, &VideoUpdate::default().with_duration_ms(duration_ms))
                    .await?;
            }
            None => logger.log_warning("could not probe duration"),
        }

        self.ctx
            .videos
            .update_video(video_id, &VideoUpdate::status(VideoStatus::Transcribing))
            .await?;

        let key = media_key(&video.user_id, video_id.as_str(), media_path);
        let url = self.ctx.media_urls.public_url(media_path, &key).await?;
        let transcription = self
            .ctx
            .transcriber
            .transcribe(&url, &self.ctx.config.transcription_language)
            .await?;

        let transcript = transcription.best().ok_or(WorkerError::EmptyTranscript)?;
        logger.log_progress(&format!("transcript received ({} chars)", transcript.len()));

        let update = VideoUpdate::status(VideoStatus::ReadyToEdit)
            .with_transcript(transcript)
            .clear_error();
        Ok(self.ctx.videos.update_video(video_id, &update).await?)
    }

    /// Best-effort frame grab for videos that arrived without a thumbnail.
    async fn ensure_thumbnail(&self, video: Video, logger: &JobLogger) -> Video {
        if video.thumbnail.is_some() {
            return video;
        }

        let work_dir = &self.ctx.config.work_dir;
        if let Err(e) = tokio::fs::create_dir_all(work_dir).await {
            logger.log_warning(&format!("cannot create {}: {}", work_dir.display(), e));
            return video;
        }
        let output = scratch_path(work_dir, "thumb", video.id.as_str(), "jpg");
        let grabbed = self
            .ctx
            .media
            .thumbnail(Path::new(&video.storage_path), &output, video.duration_ms)
            .await;
        if let Err(e) = grabbed {
            logger.log_warning(&format!("thumbnail generation failed: {}", e));
            return video;
        }

        let update = VideoUpdate::default().with_thumbnail(output.to_string_lossy());
        match self.ctx.videos.update_video(&video.id, &update).await {
            Ok(updated) => updated,
            Err(e) => {
                logger.log_warning(&format!("could not record thumbnail: {}", e));
                video
            }
        }
    }

    async fn mark_failed(&self, video_id: &VideoId, error: &WorkerError, logger: &JobLogger) {
        if let Err(e) = self
            .ctx
            .videos
            .update_video(video_id, &VideoUpdate::failed(error.to_string()))
            .await
        {
            logger.log_warning(&format!("could not record failure: {}", e));
        }
    }
}
