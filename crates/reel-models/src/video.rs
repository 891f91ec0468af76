//! Video models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::analysis::{ContentBoundary, GeneratedMetadata};
use crate::error::{ModelError, ModelResult};

/// Unique identifier for a video record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video lifecycle status.
///
/// ```text
/// uploading -> transcribing -> ready_to_edit <-> generating_metadata
///                   |               |
///                   v               v
///                failed <------ publishing -> published
/// ```
///
/// `failed` returns to `ready_to_edit` on manual reset, or to
/// `transcribing` when the video is reprocessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    #[default]
    Uploading,
    Transcribing,
    ReadyToEdit,
    GeneratingMetadata,
    Publishing,
    Published,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploading => "uploading",
            VideoStatus::Transcribing => "transcribing",
            VideoStatus::ReadyToEdit => "ready_to_edit",
            VideoStatus::GeneratingMetadata => "generating_metadata",
            VideoStatus::Publishing => "publishing",
            VideoStatus::Published => "published",
            VideoStatus::Failed => "failed",
        }
    }

    /// Parse a stored status string.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "uploading" => VideoStatus::Uploading,
            "transcribing" => VideoStatus::Transcribing,
            "ready_to_edit" => VideoStatus::ReadyToEdit,
            "generating_metadata" => VideoStatus::GeneratingMetadata,
            "publishing" => VideoStatus::Publishing,
            "published" => VideoStatus::Published,
            "failed" => VideoStatus::Failed,
            _ => return None,
        })
    }

    /// Whether `self -> next` is an allowed edge.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        use VideoStatus::*;
        match self {
            Uploading => matches!(next, Transcribing | Failed),
            Transcribing => matches!(next, ReadyToEdit | Failed),
            ReadyToEdit => matches!(next, GeneratingMetadata | Publishing),
            GeneratingMetadata => matches!(next, ReadyToEdit),
            Publishing => matches!(next, Published | Failed),
            Published => false,
            Failed => matches!(next, ReadyToEdit | Transcribing),
        }
    }

    /// Whether the user may change trim points or request a publish.
    pub fn is_editable(&self) -> bool {
        matches!(self, VideoStatus::ReadyToEdit)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a video came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    #[default]
    Upload,
    CloudImport,
    Clip,
}

impl VideoSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoSource::Upload => "upload",
            VideoSource::CloudImport => "cloud_import",
            VideoSource::Clip => "clip",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(VideoSource::Upload),
            "cloud_import" => Some(VideoSource::CloudImport),
            "clip" => Some(VideoSource::Clip),
            _ => None,
        }
    }
}

/// Pipeline trim points in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrimRange {
    pub start_ms: u64,
    pub end_ms: Option<u64>,
}

impl TrimRange {
    pub fn new(start_ms: u64, end_ms: Option<u64>) -> ModelResult<Self> {
        let range = Self { start_ms, end_ms };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> ModelResult<()> {
        match self.end_ms {
            Some(end_ms) if end_ms <= self.start_ms => Err(ModelError::InvalidTrim {
                start_ms: self.start_ms,
                end_ms,
            }),
            _ => Ok(()),
        }
    }

    /// True when a trimmed copy must be produced.
    pub fn is_active(&self) -> bool {
        self.start_ms > 0 || self.end_ms.is_some()
    }

    /// Length of the trimmed output, when bounded.
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_ms.map(|end| end - self.start_ms)
    }
}

/// Identifiers returned by the publishing platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlatformRef {
    pub video_id: String,
    pub url: Option<String>,
}

/// A media asset: an upload, a cloud import, or a derived clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    pub id: VideoId,
    pub user_id: String,
    #[serde(default)]
    pub status: VideoStatus,
    #[serde(default)]
    pub source: VideoSource,

    /// Local media file.
    pub storage_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default)]
    pub trim_start_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_end_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_start_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_end_ms: Option<u64>,

    /// Local path or http(s) URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_video_id: Option<VideoId>,
    /// Offsets into the parent's timeline, independent of the pipeline trim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_start_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_end_sec: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a new record in `uploading` state.
    pub fn new(user_id: impl Into<String>, storage_path: impl Into<String>, source: VideoSource) -> Self {
        let now = Utc::now();
        Self {
            id: VideoId::new(),
            user_id: user_id.into(),
            status: VideoStatus::Uploading,
            source,
            storage_path: storage_path.into(),
            transcript: None,
            duration_ms: None,
            trim_start_ms: 0,
            trim_end_ms: None,
            suggested_start_ms: None,
            suggested_end_ms: None,
            thumbnail: None,
            platform_video_id: None,
            platform_url: None,
            error_message: None,
            parent_video_id: None,
            clip_start_sec: None,
            clip_end_sec: None,
            title: None,
            description: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a derived clip of `parent` covering `[start_sec, end_sec)`.
    pub fn new_clip(parent: &Video, storage_path: impl Into<String>, start_sec: f64, end_sec: f64) -> Self {
        let mut clip = Self::new(parent.user_id.clone(), storage_path, VideoSource::Clip);
        clip.parent_video_id = Some(parent.id.clone());
        clip.clip_start_sec = Some(start_sec);
        clip.clip_end_sec = Some(end_sec);
        clip.duration_ms = Some(((end_sec - start_sec) * 1000.0).round() as u64);
        clip
    }

    pub fn is_clip(&self) -> bool {
        self.parent_video_id.is_some()
    }

    pub fn trim(&self) -> TrimRange {
        TrimRange {
            start_ms: self.trim_start_ms,
            end_ms: self.trim_end_ms,
        }
    }
}

/// Partial update to a [`Video`].
///
/// `None` leaves a field untouched. `error_message: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoUpdate {
    pub status: Option<VideoStatus>,
    pub transcript: Option<String>,
    pub duration_ms: Option<u64>,
    pub trim: Option<TrimRange>,
    pub suggested: Option<(u64, u64)>,
    pub thumbnail: Option<String>,
    pub platform: Option<PlatformRef>,
    pub error_message: Option<Option<String>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl VideoUpdate {
    pub fn status(status: VideoStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Move to `failed` and record the message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(VideoStatus::Failed),
            error_message: Some(Some(message.into())),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: VideoStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_trim(mut self, trim: TrimRange) -> Self {
        self.trim = Some(trim);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_platform(mut self, platform: PlatformRef) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Take whichever generated fields are present.
    pub fn with_metadata(mut self, metadata: &GeneratedMetadata) -> Self {
        if let Some(title) = metadata.title.as_ref().filter(|t| !t.trim().is_empty()) {
            self.title = Some(title.trim().to_string());
        }
        if let Some(description) = metadata.description.as_ref().filter(|d| !d.trim().is_empty()) {
            self.description = Some(description.trim().to_string());
        }
        if !metadata.tags.is_empty() {
            self.tags = Some(metadata.tags.clone());
        }
        self
    }

    pub fn with_suggested(mut self, boundary: ContentBoundary) -> Self {
        self.suggested = Some((boundary.start_ms, boundary.end_ms));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error_message = Some(None);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to `video`, enforcing the status table and the trim invariant.
    ///
    /// Setting the current status again is a no-op for the status field.
    pub fn apply(&self, video: &mut Video) -> ModelResult<()> {
        if let Some(next) = self.status {
            if next != video.status && !video.status.can_transition_to(next) {
                return Err(ModelError::invalid_transition(
                    "video",
                    video.status.as_str(),
                    next.as_str(),
                ));
            }
        }
        if let Some(trim) = &self.trim {
            trim.validate()?;
        }

        if let Some(status) = self.status {
            video.status = status;
        }
        if let Some(transcript) = &self.transcript {
            video.transcript = Some(transcript.clone());
        }
        if let Some(duration_ms) = self.duration_ms {
            video.duration_ms = Some(duration_ms);
        }
        if let Some(trim) = self.trim {
            video.trim_start_ms = trim.start_ms;
            video.trim_end_ms = trim.end_ms;
        }
        if let Some((start, end)) = self.suggested {
            video.suggested_start_ms = Some(start);
            video.suggested_end_ms = Some(end);
        }
        if let Some(thumbnail) = &self.thumbnail {
            video.thumbnail = Some(thumbnail.clone());
        }
        if let Some(platform) = &self.platform {
            video.platform_video_id = Some(platform.video_id.clone());
            video.platform_url = platform.url.clone();
        }
        if let Some(error_message) = &self.error_message {
            video.error_message = error_message.clone();
        }
        if let Some(title) = &self.title {
            video.title = Some(title.clone());
        }
        if let Some(description) = &self.description {
            video.description = Some(description.clone());
        }
        if let Some(tags) = &self.tags {
            video.tags = tags.clone();
        }
        video.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&VideoStatus::ReadyToEdit).unwrap();
        assert_eq!(json, "\"ready_to_edit\"");
        assert_eq!(VideoStatus::parse("generating_metadata"), Some(VideoStatus::GeneratingMetadata));
        assert_eq!(VideoStatus::parse("bogus"), None);
    }

    #[test]
    fn test_publish_edges() {
        assert!(VideoStatus::ReadyToEdit.can_transition_to(VideoStatus::Publishing));
        assert!(VideoStatus::Publishing.can_transition_to(VideoStatus::Published));
        assert!(VideoStatus::Publishing.can_transition_to(VideoStatus::Failed));
        assert!(VideoStatus::Failed.can_transition_to(VideoStatus::ReadyToEdit));
        assert!(!VideoStatus::Published.can_transition_to(VideoStatus::Publishing));
        assert!(!VideoStatus::Uploading.can_transition_to(VideoStatus::ReadyToEdit));
    }

    #[test]
    fn test_metadata_always_settles_to_ready() {
        assert!(VideoStatus::GeneratingMetadata.can_transition_to(VideoStatus::ReadyToEdit));
        assert!(!VideoStatus::GeneratingMetadata.can_transition_to(VideoStatus::Failed));
    }

    #[test]
    fn test_trim_range_validation() {
        assert!(TrimRange::new(5000, Some(65000)).is_ok());
        assert!(TrimRange::new(5000, None).is_ok());
        assert_eq!(
            TrimRange::new(5000, Some(5000)),
            Err(ModelError::InvalidTrim { start_ms: 5000, end_ms: 5000 })
        );

        let trim = TrimRange::new(5000, Some(65000)).unwrap();
        assert!(trim.is_active());
        assert_eq!(trim.duration_ms(), Some(60000));
        assert!(!TrimRange::new(0, None).unwrap().is_active());
    }

    #[test]
    fn test_apply_rejects_illegal_transition() {
        let mut video = Video::new("user-1", "/tmp/a.mp4", VideoSource::Upload);
        let err = VideoUpdate::status(VideoStatus::Published).apply(&mut video).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTransition { .. }));
        assert_eq!(video.status, VideoStatus::Uploading);
    }

    #[test]
    fn test_apply_failed_then_reset_clears_error() {
        let mut video = Video::new("user-1", "/tmp/a.mp4", VideoSource::Upload);
        VideoUpdate::status(VideoStatus::Transcribing).apply(&mut video).unwrap();
        VideoUpdate::failed("boom").apply(&mut video).unwrap();
        assert_eq!(video.error_message.as_deref(), Some("boom"));

        VideoUpdate::status(VideoStatus::ReadyToEdit)
            .clear_error()
            .apply(&mut video)
            .unwrap();
        assert_eq!(video.status, VideoStatus::ReadyToEdit);
        assert!(video.error_message.is_none());
    }

    #[test]
    fn test_clip_keeps_parent_offsets() {
        let parent = Video::new("user-1", "/tmp/a.mp4", VideoSource::Upload);
        let clip = Video::new_clip(&parent, "/tmp/clip.mp4", 12.5, 42.5);
        assert!(clip.is_clip());
        assert_eq!(clip.parent_video_id.as_ref(), Some(&parent.id));
        assert_eq!(clip.duration_ms, Some(30000));
        assert_eq!(clip.trim_start_ms, 0);
    }

    #[test]
    fn test_metadata_update_skips_blank_fields() {
        let mut video = Video::new("u1", "/tmp/a.mp4", VideoSource::Upload);
        video.title = Some("Original".into());
        let meta = GeneratedMetadata {
            title: Some("  ".into()),
            description: Some(" Launch recap ".into()),
            tags: vec![],
        };
        VideoUpdate::default().with_metadata(&meta).apply(&mut video).unwrap();
        assert_eq!(video.title.as_deref(), Some("Original"));
        assert_eq!(video.description.as_deref(), Some("Launch recap"));
        assert!(video.tags.is_empty());
    }
}
