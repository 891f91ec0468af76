//! Publish orchestrator.
//!
//! One run is one publish attempt: `ready_to_edit → publishing → published`
//! or `failed`. The video's status and error message are the only record of
//! the outcome.

use std::path::{Path, PathBuf};
use std::time::Instant;

use reel_media::{cue_count, extension_of, remove_scratch_files, scratch_path, shift_captions};
use reel_models::{PlatformRef, Video, VideoId, VideoStatus, VideoUpdate};
use reel_services::{PublishSubmission, ThumbnailSource};
use serde::Deserialize;
use tracing::Instrument;

use crate::context::PipelineContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics::{record_publish, record_trim_fallback};

const SCRATCH_KIND: &str = "publish";

#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    /// Resolved by the caller; opaque here.
    pub channel_id: String,
    #[serde(default)]
    pub privacy: Option<String>,
}

/// Media actually submitted, and the trim offset applied to it.
struct ResolvedMedia {
    path: PathBuf,
    temp: bool,
    offset_ms: Option<u64>,
}

#[derive(Clone)]
pub struct PublishOrchestrator {
    ctx: PipelineContext,
}

impl PublishOrchestrator {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Move the video to `publishing`. Fails if it is not editable.
    ///
    /// Callers that run [`PublishOrchestrator::run`] in the background call
    /// this first so the rejection reaches the client.
    pub async fn begin(&self, video_id: &VideoId) -> WorkerResult<Video> {
        Ok(self
            .ctx
            .videos
            .update_video(video_id, &VideoUpdate::status(VideoStatus::Publishing).clear_error())
            .await?)
    }

    /// Full attempt: [`begin`](Self::begin) then [`run`](Self::run).
    pub async fn publish(&self, video_id: &VideoId, request: &PublishRequest) -> WorkerResult<Video> {
        self.begin(video_id).await?;
        self.run(video_id, request).await
    }

    /// Submit a video already in `publishing` and record the outcome.
    pub async fn run(&self, video_id: &VideoId, request: &PublishRequest) -> WorkerResult<Video> {
        let logger = JobLogger::new(video_id.as_str(), "publish");
        let span = logger.create_span();

        async {
            logger.log_start(&format!("channel {}", request.channel_id));
            let started = Instant::now();
            let video = self.ctx.load_video(video_id).await?;

            let media = self.resolve_media(&video, &logger).await;
            let result = self.submit(&video, &media, request).await;
            record_publish(result.is_ok(), started.elapsed().as_secs_f64());

            match result {
                Ok(platform) => {
                    let update = VideoUpdate::status(VideoStatus::Published).with_platform(platform);
                    let published = self.ctx.videos.update_video(video_id, &update).await?;
                    if media.temp {
                        if let Err(e) = tokio::fs::remove_file(&media.path).await {
                            logger.log_warning(&format!("could not remove {}: {}", media.path.display(), e));
                        }
                    }
                    logger.log_completion(published.platform_url.as_deref().unwrap_or("published"));
                    Ok(published)
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    self.ctx
                        .videos
                        .update_video(video_id, &VideoUpdate::failed(e.to_string()))
                        .await?;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Trimmed copy when a trim is set and ffmpeg succeeds; the original otherwise.
    async fn resolve_media(&self, video: &Video, logger: &JobLogger) -> ResolvedMedia {
        let work_dir = &self.ctx.config.work_dir;
        let removed = remove_scratch_files(work_dir, SCRATCH_KIND, video.id.as_str()).await;
        if removed > 0 {
            logger.log_progress(&format!("removed {} stale publish file(s)", removed));
        }

        let source = PathBuf::from(&video.storage_path);
        let untrimmed = ResolvedMedia {
            path: source.clone(),
            temp: false,
            offset_ms: None,
        };

        let trim = video.trim();
        if !trim.is_active() {
            return untrimmed;
        }

        if let Err(e) = tokio::fs::create_dir_all(work_dir).await {
            logger.log_warning(&format!("cannot create {}: {}", work_dir.display(), e));
            record_trim_fallback();
            return untrimmed;
        }
        let output = scratch_path(
            work_dir,
            SCRATCH_KIND,
            video.id.as_str(),
            &extension_of(&video.storage_path),
        );
        match self
            .ctx
            .media
            .trim(&source, &output, trim.start_ms, trim.end_ms)
            .await
        {
            Ok(()) => ResolvedMedia {
                path: output,
                temp: true,
                offset_ms: Some(trim.start_ms),
            },
            Err(e) => {
                logger.log_warning(&format!("trim failed, publishing untrimmed original: {}", e));
                record_trim_fallback();
                untrimmed
            }
        }
    }

    async fn submit(
        &self,
        video: &Video,
        media: &ResolvedMedia,
        request: &PublishRequest,
    ) -> WorkerResult<PlatformRef> {
        let submission = PublishSubmission {
            video_path: media.path.clone(),
            title: video.title.clone().unwrap_or_else(|| fallback_title(&video.storage_path)),
            channel_id: request.channel_id.clone(),
            description: video.description.clone().unwrap_or_default(),
            tags: video.tags.clone(),
            privacy: request
                .privacy
                .clone()
                .unwrap_or_else(|| self.ctx.config.default_privacy.clone()),
            thumbnail: video.thumbnail.as_deref().map(ThumbnailSource::from_reference),
            captions: captions_for(video.transcript.as_deref(), media.offset_ms),
        };

        let limit = self.ctx.config.publish_timeout;
        let published = tokio::time::timeout(limit, self.ctx.publisher.publish(&submission))
            .await
            .map_err(|_| WorkerError::timeout("publish", limit))??;

        Ok(PlatformRef {
            video_id: published.video_id,
            url: published.url,
        })
    }
}

/// Caption track to attach: shifted when a trim offset was applied.
///
/// Plain-text transcripts carry no cues and are not attached.
fn captions_for(transcript: Option<&str>, offset_ms: Option<u64>) -> Option<String> {
    let transcript = transcript?;
    if cue_count(transcript) == 0 {
        return None;
    }
    Some(match offset_ms {
        Some(offset) => shift_captions(transcript, offset as i64),
        None => transcript.to_string(),
    })
}

fn fallback_title(storage_path: &str) -> String {
    Path::new(storage_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use reel_store::VideoStore;
    use reel_models::TrimRange;
    use reel_services::ServiceError;

    const SRT: &str = "1\n00:00:02,000 --> 00:00:04,000\nintro\n\n\
                       2\n00:00:04,500 --> 00:00:07,000\nstraddles\n\n\
                       3\n00:01:00,000 --> 00:01:02,000\nmain\n";

    fn request() -> PublishRequest {
        PublishRequest {
            channel_id: "chan-9".into(),
            privacy: None,
        }
    }

    async fn trimmed_video(h: &Harness, start: u64, end: Option<u64>) -> Video {
        let video = h.seed_ready_video(SRT).await;
        h.store
            .update_video(&video.id, &VideoUpdate::default().with_trim(TrimRange::new(start, end).unwrap()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_trim_and_shift_captions() {
        let h = Harness::new();
        let video = trimmed_video(&h, 5000, Some(65000)).await;

        let published = PublishOrchestrator::new(h.ctx.clone())
            .publish(&video.id, &request())
            .await
            .unwrap();
        assert_eq!(published.status, VideoStatus::Published);
        assert_eq!(published.platform_video_id.as_deref(), Some("platform-1"));

        assert_eq!(h.media.trims(), vec![(5000, Some(65000))]);
        let submission = h.publisher.last();
        assert_ne!(submission.video_path, Path::new(&video.storage_path));
        assert_eq!(submission.privacy, "private");
        assert_eq!(submission.channel_id, "chan-9");

        let captions = submission.captions.unwrap();
        assert!(!captions.contains("intro"));
        assert!(captions.contains("00:00:00,000 --> 00:00:02,000\nstraddles"));
        assert!(captions.contains("00:00:55,000 --> 00:00:57,000\nmain"));

        // Temp file deleted on success
        assert!(!submission.video_path.exists());
    }

    #[tokio::test]
    async fn test_trim_failure_falls_back_to_original() {
        let h = Harness::new();
        h.media.fail_trims();
        let video = trimmed_video(&h, 5000, None).await;

        let published = PublishOrchestrator::new(h.ctx.clone())
            .publish(&video.id, &request())
            .await
            .unwrap();
        assert_eq!(published.status, VideoStatus::Published);

        let submission = h.publisher.last();
        assert_eq!(submission.video_path, Path::new(&video.storage_path));
        // No offset applied, captions attached unshifted
        assert_eq!(submission.captions.as_deref(), Some(SRT));
    }

    #[tokio::test]
    async fn test_no_trim_sends_original() {
        let h = Harness::new();
        let video = h.seed_ready_video("just words, no cues").await;

        PublishOrchestrator::new(h.ctx.clone())
            .publish(
                &video.id,
                &PublishRequest {
                    channel_id: "c".into(),
                    privacy: Some("public".into()),
                },
            )
            .await
            .unwrap();

        assert!(h.media.trims().is_empty());
        let submission = h.publisher.last();
        assert_eq!(submission.privacy, "public");
        assert!(submission.captions.is_none());
    }

    #[tokio::test]
    async fn test_platform_error_recorded_with_detail() {
        let h = Harness::new();
        h.publisher.fail_with(ServiceError::Http {
            service: "publisher",
            status: 500,
            message: "daily upload limit reached".into(),
            body: r#"{"error":"daily upload limit reached"}"#.into(),
        });
        let video = trimmed_video(&h, 1000, None).await;

        let err = PublishOrchestrator::new(h.ctx.clone())
            .publish(&video.id, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Service(_)));

        let stored = h.video(&video.id).await;
        assert_eq!(stored.status, VideoStatus::Failed);
        let message = stored.error_message.unwrap();
        assert!(message.contains("500"));
        assert!(message.contains("daily upload limit reached"));

        // The trimmed copy stays until the next attempt cleans it up
        let leftover = h.publisher.last().video_path;
        assert!(leftover.exists());

        h.publisher.succeed();
        h.store
            .update_video(&video.id, &VideoUpdate::status(VideoStatus::ReadyToEdit).clear_error())
            .await
            .unwrap();
        PublishOrchestrator::new(h.ctx.clone())
            .publish(&video.id, &request())
            .await
            .unwrap();
        assert!(!leftover.exists());
    }

    #[tokio::test]
    async fn test_publish_timeout() {
        let h = Harness::with_publish_timeout(std::time::Duration::from_millis(50));
        h.publisher.delay(std::time::Duration::from_secs(5));
        let video = h.seed_ready_video("words").await;

        let err = PublishOrchestrator::new(h.ctx.clone())
            .publish(&video.id, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Timeout { stage: "publish", .. }));
        assert_eq!(h.video(&video.id).await.status, VideoStatus::Failed);
    }

    #[tokio::test]
    async fn test_only_editable_videos_publish() {
        let h = Harness::new();
        let video = h.seed_video(VideoStatus::Transcribing).await;

        let err = PublishOrchestrator::new(h.ctx.clone())
            .publish(&video.id, &request())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(h.publisher.submissions().is_empty());
        assert_eq!(h.video(&video.id).await.status, VideoStatus::Transcribing);
    }

    #[test]
    fn test_captions_for() {
        assert_eq!(captions_for(None, Some(10)), None);
        assert_eq!(captions_for(Some("plain"), None), None);
        let shifted = captions_for(Some(SRT), Some(0)).unwrap();
        assert_eq!(captions_for(Some(&shifted), Some(0)).unwrap(), shifted);
    }
}
