//! Video handlers: direct upload, status polling, editing and the actions
//! that hand work to the orchestrators.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use reel_media::{extension_of, scratch_path};
use reel_models::{SensitiveSegment, TrimRange, Video, VideoId, VideoSource, VideoStatus, VideoUpdate};
use reel_worker::analyzers::confidential_segments;
use reel_worker::{create_clip, spawn_metadata, ClipRequest, PublishRequest};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics::record_upload;
use crate::state::AppState;

const PRIVACY_LEVELS: [&str; 3] = ["public", "unlisted", "private"];

/// Load a video the caller owns. Other users' videos look missing.
async fn owned_video(state: &AppState, user: &AuthUser, id: &str) -> ApiResult<Video> {
    state
        .ctx
        .videos
        .get_video(&VideoId::from_string(id))
        .await?
        .filter(|v| v.user_id == user.uid)
        .ok_or_else(|| ApiError::not_found(format!("Video {}", id)))
}

fn require_status(video: &Video, expected: VideoStatus, action: &str) -> ApiResult<()> {
    if video.status != expected {
        return Err(ApiError::conflict(format!(
            "cannot {} a video in status {}",
            action,
            video.status.as_str()
        )));
    }
    Ok(())
}

/// Run the processing orchestrator in the background.
fn spawn_processing(state: &AppState, video_id: VideoId) {
    let processor = state.processor.clone();
    tokio::spawn(async move {
        // Failures are recorded on the video and logged by the orchestrator
        if let Err(e) = processor.process(&video_id).await {
            debug!(video_id = %video_id, "Processing ended with error: {}", e);
        }
    });
}

// ============================================================================
// Upload
// ============================================================================

/// `POST /api/videos/upload`: multipart with a `file` part and an optional `title`.
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Video>)> {
    let work_dir = state.ctx.config.work_dir.clone();
    tokio::fs::create_dir_all(&work_dir).await?;

    let mut video = Video::new(user.uid.clone(), "", VideoSource::Upload);
    let mut stored: Option<(PathBuf, u64)> = None;
    let parts = match read_upload(&mut multipart, &work_dir, &video.id, &mut stored).await {
        Ok(parts) => parts,
        Err(e) => {
            if let Some((path, _)) = &stored {
                discard(path).await;
            }
            return Err(e);
        }
    };

    let Some((path, bytes)) = stored else {
        return Err(ApiError::bad_request("missing 'file' part"));
    };
    if bytes == 0 {
        discard(&path).await;
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    video.storage_path = path.to_string_lossy().into_owned();
    video.title = parts
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or(parts.file_stem);
    if let Err(e) = state.ctx.videos.create_video(&video).await {
        discard(&path).await;
        return Err(e.into());
    }
    record_upload(bytes);
    info!(video_id = %video.id, user_id = %user.uid, bytes, "Upload stored");

    spawn_processing(&state, video.id.clone());
    Ok((StatusCode::ACCEPTED, Json(video)))
}

#[derive(Debug, Default)]
struct UploadParts {
    title: Option<String>,
    file_stem: Option<String>,
}

/// Drain the multipart body. The `file` part is written to scratch and
/// recorded in `stored` as soon as it exists, so the caller can remove it
/// when a later part fails.
async fn read_upload(
    multipart: &mut Multipart,
    work_dir: &FsPath,
    video_id: &VideoId,
    stored: &mut Option<(PathBuf, u64)>,
) -> ApiResult<UploadParts> {
    let mut parts = UploadParts::default();
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                if stored.is_some() {
                    return Err(ApiError::bad_request("only one file per upload"));
                }
                let file_name = field.file_name().unwrap_or_default().to_string();
                parts.file_stem = FsPath::new(&file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .filter(|s| !s.is_empty());

                let path = scratch_path(work_dir, "upload", video_id.as_str(), &extension_of(&file_name));
                *stored = Some((path.clone(), 0));
                let bytes = write_field(&mut field, &path).await?;
                *stored = Some((path, bytes));
            }
            Some("title") => parts.title = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(parts)
}

async fn write_field(field: &mut Field<'_>, path: &FsPath) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

async fn discard(path: &FsPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove partial upload {}: {}", path.display(), e);
    }
}

// ============================================================================
// Reads
// ============================================================================

pub async fn get_video(State(state): State<AppState>, user: AuthUser, Path(id): Path<String>) -> ApiResult<Json<Video>> {
    Ok(Json(owned_video(&state, &user, &id).await?))
}

/// The bare status string, for polling.
pub async fn get_video_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<&'static str> {
    Ok(owned_video(&state, &user, &id).await?.status.as_str())
}

// ============================================================================
// Editing
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TrimBody {
    pub start_ms: u64,
    #[serde(default)]
    pub end_ms: Option<u64>,
}

pub async fn update_trim(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<TrimBody>,
) -> ApiResult<Json<Video>> {
    let video = owned_video(&state, &user, &id).await?;
    if !video.status.is_editable() {
        return Err(ApiError::conflict(format!(
            "cannot trim a video in status {}",
            video.status.as_str()
        )));
    }

    let trim = TrimRange::new(body.start_ms, body.end_ms).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if let Some(duration_ms) = video.duration_ms {
        if trim.start_ms >= duration_ms || trim.end_ms.is_some_and(|end| end > duration_ms) {
            return Err(ApiError::bad_request(format!(
                "trim must lie within the video's {} ms",
                duration_ms
            )));
        }
    }

    let updated = state
        .ctx
        .videos
        .update_video(&video.id, &VideoUpdate::default().with_trim(trim))
        .await?;
    Ok(Json(updated))
}

/// `failed → ready_to_edit`, clearing the error.
pub async fn reset_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Video>> {
    let video = owned_video(&state, &user, &id).await?;
    require_status(&video, VideoStatus::Failed, "reset")?;

    let updated = state
        .ctx
        .videos
        .update_video(&video.id, &VideoUpdate::status(VideoStatus::ReadyToEdit).clear_error())
        .await?;
    info!(video_id = %video.id, "Video reset to ready_to_edit");
    Ok(Json(updated))
}

/// `failed → transcribing`, then run the processing orchestrator again.
pub async fn reprocess_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Video>)> {
    let video = owned_video(&state, &user, &id).await?;
    require_status(&video, VideoStatus::Failed, "reprocess")?;

    let updated = state
        .ctx
        .videos
        .update_video(&video.id, &VideoUpdate::status(VideoStatus::Transcribing).clear_error())
        .await?;
    spawn_processing(&state, video.id.clone());
    Ok((StatusCode::ACCEPTED, Json(updated)))
}

pub async fn regenerate_metadata(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Video>)> {
    let video = owned_video(&state, &user, &id).await?;
    require_status(&video, VideoStatus::ReadyToEdit, "generate metadata for")?;
    if video.transcript.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err(ApiError::bad_request("video has no transcript"));
    }

    spawn_metadata(state.ctx.clone(), video.id.clone());
    Ok((StatusCode::ACCEPTED, Json(video)))
}

// ============================================================================
// Publishing and clips
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct PublishBody {
    #[validate(length(min = 1, max = 256))]
    pub channel_id: String,
    #[serde(default)]
    pub privacy: Option<String>,
}

pub async fn publish_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<PublishBody>,
) -> ApiResult<(StatusCode, Json<Video>)> {
    body.validate()?;
    if let Some(privacy) = body.privacy.as_deref() {
        if !PRIVACY_LEVELS.contains(&privacy) {
            return Err(ApiError::Validation(format!(
                "privacy must be one of {}",
                PRIVACY_LEVELS.join(", ")
            )));
        }
    }
    let video = owned_video(&state, &user, &id).await?;

    // Rejections (not editable) surface here; the submission runs detached.
    let publishing = state.publisher.begin(&video.id).await?;
    let request = PublishRequest {
        channel_id: body.channel_id,
        privacy: body.privacy,
    };
    let orchestrator = state.publisher.clone();
    let video_id = video.id.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run(&video_id, &request).await {
            debug!(video_id = %video_id, "Publish ended with error: {}", e);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(publishing)))
}

pub async fn create_video_clip(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ClipRequest>,
) -> ApiResult<(StatusCode, Json<Video>)> {
    let parent = owned_video(&state, &user, &id).await?;
    let clip = create_clip(&state.ctx, &parent.id, &body).await?;
    Ok((StatusCode::CREATED, Json(clip)))
}

#[derive(Debug, Serialize)]
pub struct ConfidentialityResponse {
    pub segments: Vec<SensitiveSegment>,
}

/// Flag confidential transcript spans. Nothing is persisted.
pub async fn analyze_confidentiality(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ConfidentialityResponse>> {
    let video = owned_video(&state, &user, &id).await?;
    let transcript = video
        .transcript
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("video has no transcript"))?;

    let segments = confidential_segments(state.ctx.llm.as_ref(), transcript).await?;
    info!(video_id = %video.id, flagged = segments.len(), "Confidentiality analysis complete");
    Ok(Json(ConfidentialityResponse { segments }))
}
