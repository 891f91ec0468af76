//! Public URLs for local media.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::client::R2Client;
use crate::error::{StorageError, StorageResult};

/// Turns a local media file into a URL an external service can fetch.
#[async_trait]
pub trait MediaUrlResolver: Send + Sync {
    async fn public_url(&self, local_path: &Path, key: &str) -> StorageResult<String>;
}

/// Object key for a video's media: `media/{user_id}/{video_id}.{ext}`.
pub fn media_key(user_id: &str, video_id: &str, local_path: &Path) -> String {
    let ext = local_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "mp4".to_string());
    format!("media/{}/{}.{}", user_id, video_id, ext)
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Uploads to R2 and presigns a GET URL.
pub struct R2MediaUrls {
    client: R2Client,
    ttl: Duration,
}

impl R2MediaUrls {
    pub fn new(client: R2Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }
}

#[async_trait]
impl MediaUrlResolver for R2MediaUrls {
    async fn public_url(&self, local_path: &Path, key: &str) -> StorageResult<String> {
        self.client
            .upload_file(local_path, key, content_type_for(local_path))
            .await?;
        let url = self.client.presign_get(key, self.ttl).await?;
        debug!(key, ttl_secs = self.ttl.as_secs(), "Presigned media URL");
        Ok(url)
    }
}

/// `file://` URLs, for local runs where the transcriber shares the filesystem.
#[derive(Debug, Default, Clone)]
pub struct FileUrlResolver;

#[async_trait]
impl MediaUrlResolver for FileUrlResolver {
    async fn public_url(&self, local_path: &Path, _key: &str) -> StorageResult<String> {
        let absolute = tokio::fs::canonicalize(local_path).await?;
        Url::from_file_path(&absolute)
            .map(String::from)
            .map_err(|_| StorageError::InvalidPath(absolute.display().to_string()))
    }
}
