//! Cloud-storage client (Dropbox HTTP API).
//!
//! Calls are made with the user's own access token, taken from their
//! stored `CloudConnection`.

use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use reel_models::CloudFile;
use reqwest::Client;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::http::check_status;

const SERVICE: &str = "dropbox";

#[async_trait]
pub trait CloudStorageClient: Send + Sync {
    /// A short-lived direct download URL for `path`.
    async fn temporary_download_link(&self, access_token: &str, path: &str) -> ServiceResult<String>;

    /// Files (not folders) directly under `path`.
    async fn list_files(&self, access_token: &str, path: &str) -> ServiceResult<Vec<CloudFile>>;

    /// Stream `url` into `dest`, returning the byte count.
    async fn download_to_file(&self, url: &str, dest: &Path) -> ServiceResult<u64>;
}

#[derive(Debug, Clone)]
pub struct DropboxConfig {
    pub api_url: String,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.dropboxapi.com".to_string(),
        }
    }
}

impl DropboxConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("DROPBOX_API_URL").unwrap_or_else(|_| "https://api.dropboxapi.com".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TemporaryLink {
    link: String,
}

#[derive(Debug, Deserialize)]
struct ListFolder {
    entries: Vec<Entry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
enum Entry {
    File {
        name: String,
        path_display: Option<String>,
        path_lower: Option<String>,
        #[serde(default)]
        size: u64,
    },
    Folder {},
    Deleted {},
}

pub struct DropboxClient {
    http: Client,
    config: DropboxConfig,
}

impl DropboxClient {
    pub fn new(config: DropboxConfig) -> ServiceResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> ServiceResult<Self> {
        Self::new(DropboxConfig::from_env())
    }

    async fn rpc<T: serde::de::DeserializeOwned>(
        &self,
        access_token: &str,
        endpoint: &str,
        body: serde_json::Value,
    ) -> ServiceResult<T> {
        let url = format!("{}/2/{}", self.config.api_url.trim_end_matches('/'), endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        response
            .json()
            .await
            .map_err(|e| ServiceError::malformed(SERVICE, e.to_string()))
    }
}

/// Dropbox names the root folder `""`, not `"/"`.
fn api_path(path: &str) -> &str {
    let trimmed = path.trim();
    if trimmed == "/" {
        ""
    } else {
        trimmed
    }
}

#[async_trait]
impl CloudStorageClient for DropboxClient {
    async fn temporary_download_link(&self, access_token: &str, path: &str) -> ServiceResult<String> {
        let link: TemporaryLink = self
            .rpc(
                access_token,
                "files/get_temporary_link",
                serde_json::json!({ "path": api_path(path) }),
            )
            .await?;
        debug!("Resolved temporary link for {}", path);
        Ok(link.link)
    }

    async fn list_files(&self, access_token: &str, path: &str) -> ServiceResult<Vec<CloudFile>> {
        let mut page: ListFolder = self
            .rpc(
                access_token,
                "files/list_folder",
                serde_json::json!({ "path": api_path(path), "recursive": false }),
            )
            .await?;

        let mut files = Vec::new();
        loop {
            for entry in page.entries {
                if let Entry::File {
                    name,
                    path_display,
                    path_lower,
                    size,
                } = entry
                {
                    let file_path = path_display
                        .or(path_lower)
                        .unwrap_or_else(|| format!("{}/{}", api_path(path).trim_end_matches('/'), name));
                    files.push(CloudFile {
                        path: file_path,
                        name,
                        size,
                    });
                }
            }
            if !page.has_more {
                break;
            }
            page = self
                .rpc(
                    access_token,
                    "files/list_folder/continue",
                    serde_json::json!({ "cursor": page.cursor }),
                )
                .await?;
        }
        Ok(files)
    }

    async fn download_to_file(&self, url: &str, dest: &Path) -> ServiceResult<u64> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ServiceError::transport(SERVICE, e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}
