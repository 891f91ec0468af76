//! Background metadata generation.
//!
//! Runs after a video reaches `ready_to_edit`: moves it to
//! `generating_metadata`, asks the LLM for publishing metadata and a content
//! boundary, and always settles back to `ready_to_edit`.

use reel_models::{ContentBoundary, GeneratedMetadata, VideoId, VideoStatus, VideoUpdate};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::analyzers::{content_boundary, generate_metadata};
use crate::context::PipelineContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics::record_metadata;

/// Fire-and-forget metadata generation. The outcome is only logged.
pub fn spawn_metadata(ctx: PipelineContext, video_id: VideoId) -> JoinHandle<()> {
    let logger = JobLogger::new(video_id.as_str(), "metadata");
    let span = logger.create_span();
    tokio::spawn(
        async move {
            match run_metadata(&ctx, &video_id, &logger).await {
                Ok(meta) => {
                    record_metadata(true);
                    logger.log_completion(&format!(
                        "title={:?} tags={}",
                        meta.title.as_deref().unwrap_or(""),
                        meta.tags.len()
                    ));
                }
                Err(e) => {
                    record_metadata(false);
                    logger.log_warning(&format!("metadata generation failed: {}", e));
                }
            }
        }
        .instrument(span),
    )
}

/// Generate and persist metadata for one video.
pub async fn run_metadata(
    ctx: &PipelineContext,
    video_id: &VideoId,
    logger: &JobLogger,
) -> WorkerResult<GeneratedMetadata> {
    let video = ctx
        .videos
        .update_video(video_id, &VideoUpdate::status(VideoStatus::GeneratingMetadata))
        .await?;
    logger.log_start("generating metadata");

    let outcome = match video.transcript.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(transcript) => analyze(ctx, transcript, video.duration_ms, logger).await,
        None => Err(WorkerError::EmptyTranscript),
    };

    let mut settle = VideoUpdate::status(VideoStatus::ReadyToEdit);
    if let Ok((meta, boundary)) = &outcome {
        settle = settle.with_metadata(meta);
        if let Some(boundary) = boundary {
            settle = settle.with_suggested(*boundary);
        }
    }
    ctx.videos.update_video(video_id, &settle).await?;

    outcome.map(|(meta, _)| meta)
}

async fn analyze(
    ctx: &PipelineContext,
    transcript: &str,
    duration_ms: Option<u64>,
    logger: &JobLogger,
) -> WorkerResult<(GeneratedMetadata, Option<ContentBoundary>)> {
    let max_chars = ctx.config.metadata_transcript_chars;
    let meta = generate_metadata(ctx.llm.as_ref(), transcript, max_chars).await?;

    let boundary = match content_boundary(ctx.llm.as_ref(), transcript, max_chars, duration_ms).await {
        Ok(boundary) => boundary,
        Err(e) => {
            logger.log_warning(&format!("content boundary analysis failed: {}", e));
            None
        }
    };
    Ok((meta, boundary))
}
