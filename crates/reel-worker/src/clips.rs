//! Derived clips.
//!
//! A clip is a child video cut from its parent's media. Its offsets are on
//! the parent's original timeline; the parent's pipeline trim does not move
//! them.

use std::path::Path;

use reel_media::{cue_count, extension_of, scratch_path, window_captions};
use reel_models::{Video, VideoId, VideoStatus};
use serde::Deserialize;
use tracing::info;

use crate::context::PipelineContext;
use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Clone, Deserialize)]
pub struct ClipRequest {
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(default)]
    pub title: Option<String>,
}

impl ClipRequest {
    fn validate(&self, parent_duration_ms: Option<u64>) -> WorkerResult<()> {
        if !self.start_sec.is_finite() || !self.end_sec.is_finite() || self.start_sec < 0.0 {
            return Err(WorkerError::invalid_input("clip offsets must be non-negative numbers"));
        }
        if self.end_sec <= self.start_sec {
            return Err(WorkerError::invalid_input("clip end must be after its start"));
        }
        if let Some(duration_ms) = parent_duration_ms {
            if self.end_sec * 1000.0 > duration_ms as f64 {
                return Err(WorkerError::invalid_input("clip extends past the end of the video"));
            }
        }
        Ok(())
    }
}

/// Cut `[start_sec, end_sec)` out of `parent_id` into a new `ready_to_edit` video.
pub async fn create_clip(ctx: &PipelineContext, parent_id: &VideoId, request: &ClipRequest) -> WorkerResult<Video> {
    let parent = ctx.load_video(parent_id).await?;
    if !matches!(parent.status, VideoStatus::ReadyToEdit | VideoStatus::Published) {
        return Err(WorkerError::invalid_input(format!(
            "cannot clip a video in status {}",
            parent.status.as_str()
        )));
    }
    request.validate(parent.duration_ms)?;

    let start_ms = (request.start_sec * 1000.0).round() as u64;
    let end_ms = (request.end_sec * 1000.0).round() as u64;

    let work_dir = &ctx.config.work_dir;
    tokio::fs::create_dir_all(work_dir).await?;
    let output = scratch_path(work_dir, "clip", parent_id.as_str(), &extension_of(&parent.storage_path));
    ctx.media
        .trim(Path::new(&parent.storage_path), &output, start_ms, Some(end_ms))
        .await?;

    let mut clip = Video::new_clip(&parent, output.to_string_lossy(), request.start_sec, request.end_sec);
    clip.status = VideoStatus::ReadyToEdit;
    clip.title = request
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| parent.title.as_ref().map(|t| format!("{} (clip)", t)));
    clip.description = parent.description.clone();
    clip.tags = parent.tags.clone();
    clip.transcript = parent.transcript.as_deref().and_then(|t| {
        if cue_count(t) > 0 {
            Some(window_captions(t, start_ms, end_ms))
        } else {
            None
        }
    });

    let thumb = scratch_path(work_dir, "thumb", clip.id.as_str(), "jpg");
    match ctx.media.thumbnail(&output, &thumb, clip.duration_ms).await {
        Ok(()) => clip.thumbnail = Some(thumb.to_string_lossy().into_owned()),
        Err(e) => tracing::warn!(clip_id = %clip.id, "Clip thumbnail failed: {}", e),
    }

    ctx.videos.create_video(&clip).await?;
    info!(parent_id = %parent_id, clip_id = %clip.id, start_ms, end_ms, "Created clip");
    Ok(clip)
}
