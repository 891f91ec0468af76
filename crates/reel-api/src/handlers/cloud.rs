//! Cloud-storage browsing.

use axum::extract::{Query, State};
use axum::Json;
use reel_models::{CloudFile, CloudProvider};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub path: String,
    pub files: Vec<CloudFile>,
}

/// `GET /api/cloud/files?path=`: files in the caller's connected account.
pub async fn list_cloud_files(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListFilesQuery>,
) -> ApiResult<Json<ListFilesResponse>> {
    let provider = CloudProvider::Dropbox;
    let connection = state
        .ctx
        .connections
        .get_connection(&user.uid, provider)
        .await?
        .ok_or_else(|| ApiError::bad_request(format!("no {} account connected", provider)))?;

    let files = state
        .ctx
        .cloud
        .list_files(&connection.access_token, &query.path)
        .await?;
    Ok(Json(ListFilesResponse {
        path: query.path,
        files,
    }))
}
