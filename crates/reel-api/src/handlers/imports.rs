//! Cloud import queue handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use reel_models::{CloudFile, CloudProvider, ImportRequest, ImportRequestId};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics::record_imports_enqueued;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct EnqueueImportsBody {
    #[serde(default)]
    pub provider: CloudProvider,
    #[validate(length(min = 1, max = 100))]
    pub files: Vec<CloudFile>,
}

/// `POST /api/imports`: queue one request per selected file.
pub async fn enqueue_imports(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<EnqueueImportsBody>,
) -> ApiResult<(StatusCode, Json<Vec<ImportRequest>>)> {
    body.validate()?;
    if let Some(bad) = body.files.iter().find(|f| f.path.trim().is_empty()) {
        return Err(ApiError::Validation(format!("file '{}' has no path", bad.name)));
    }
    if state
        .ctx
        .connections
        .get_connection(&user.uid, body.provider)
        .await?
        .is_none()
    {
        return Err(ApiError::bad_request(format!("no {} account connected", body.provider)));
    }

    let requests: Vec<ImportRequest> = body
        .files
        .iter()
        .map(|file| ImportRequest::new(user.uid.clone(), body.provider, file))
        .collect();
    state.ctx.imports.enqueue(&requests).await?;
    record_imports_enqueued(requests.len());
    info!(user_id = %user.uid, count = requests.len(), "Imports queued");

    Ok((StatusCode::CREATED, Json(requests)))
}

/// The caller's imports, newest first.
pub async fn list_imports(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<ImportRequest>>> {
    Ok(Json(state.ctx.imports.list_imports(&user.uid).await?))
}

/// Cancel a still-`queued` import.
pub async fn cancel_import(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ImportRequest>> {
    let cancelled = state
        .ctx
        .imports
        .cancel_import(&ImportRequestId::from_string(id), &user.uid)
        .await?;
    info!(import_id = %cancelled.id, "Import cancelled");
    Ok(Json(cancelled))
}
