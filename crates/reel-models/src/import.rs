//! Cloud import request models.
//!
//! An [`ImportRequest`] is one queued pull of a single file from a user's
//! cloud-storage account. Rows are created in bulk by a "select files" action
//! and drained in creation order by the ingest worker.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::cloud::{CloudFile, CloudProvider};
use crate::error::{ModelError, ModelResult};
use crate::video::VideoId;

/// Unique identifier for an import request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ImportRequestId(pub String);

impl ImportRequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ImportRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImportRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImportRequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Import request status.
///
/// `queued -> downloading -> processing -> transcribing -> ready`, with
/// `failed` reachable from every non-terminal state and `cancelled` only
/// from `queued`. No state is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[default]
    Queued,
    Downloading,
    Processing,
    Transcribing,
    Ready,
    Failed,
    Cancelled,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Queued => "queued",
            ImportStatus::Downloading => "downloading",
            ImportStatus::Processing => "processing",
            ImportStatus::Transcribing => "transcribing",
            ImportStatus::Ready => "ready",
            ImportStatus::Failed => "failed",
            ImportStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "queued" => ImportStatus::Queued,
            "downloading" => ImportStatus::Downloading,
            "processing" => ImportStatus::Processing,
            "transcribing" => ImportStatus::Transcribing,
            "ready" => ImportStatus::Ready,
            "failed" => ImportStatus::Failed,
            "cancelled" => ImportStatus::Cancelled,
            _ => return None,
        })
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Ready | ImportStatus::Failed | ImportStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: ImportStatus) -> bool {
        use ImportStatus::*;
        match self {
            Queued => matches!(next, Downloading | Failed | Cancelled),
            Downloading => matches!(next, Processing | Failed),
            Processing => matches!(next, Transcribing | Failed),
            Transcribing => matches!(next, Ready | Failed),
            Ready | Failed | Cancelled => false,
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One cloud-to-local import task.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportRequest {
    pub id: ImportRequestId,
    pub user_id: String,
    pub provider: CloudProvider,
    pub source_path: String,
    pub source_name: String,
    #[serde(default)]
    pub source_size: u64,
    #[serde(default)]
    pub status: ImportStatus,
    /// Free-form stage details for progress display.
    #[serde(default)]
    pub progress: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<VideoId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportRequest {
    /// Create a `queued` request for one cloud file.
    pub fn new(user_id: impl Into<String>, provider: CloudProvider, file: &CloudFile) -> Self {
        Self {
            id: ImportRequestId::new(),
            user_id: user_id.into(),
            provider,
            source_path: file.path.clone(),
            source_name: file.name.clone(),
            source_size: file.size,
            status: ImportStatus::Queued,
            progress: serde_json::Value::Null,
            error_message: None,
            video_id: None,
            local_path: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Partial update to an [`ImportRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportUpdate {
    pub status: Option<ImportStatus>,
    pub progress: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub video_id: Option<VideoId>,
    pub local_path: Option<String>,
}

impl ImportUpdate {
    pub fn status(status: ImportStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ImportStatus::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: serde_json::Value) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_video_id(mut self, video_id: VideoId) -> Self {
        self.video_id = Some(video_id);
        self
    }

    pub fn with_local_path(mut self, local_path: impl Into<String>) -> Self {
        self.local_path = Some(local_path.into());
        self
    }

    /// Apply to `request`.
    ///
    /// Entering `downloading` stamps `started_at`; entering a terminal state
    /// stamps `completed_at`. `video_id` may be assigned once.
    pub fn apply(&self, request: &mut ImportRequest) -> ModelResult<()> {
        if let Some(next) = self.status {
            if !request.status.can_transition_to(next) {
                return Err(ModelError::invalid_transition(
                    "import",
                    request.status.as_str(),
                    next.as_str(),
                ));
            }
        }
        if self.video_id.is_some() && request.video_id.is_some() {
            return Err(ModelError::AlreadySet("video_id"));
        }

        if let Some(next) = self.status {
            request.status = next;
            let now = Utc::now();
            if next == ImportStatus::Downloading {
                request.started_at = Some(now);
            }
            if next.is_terminal() {
                request.completed_at = Some(now);
            }
        }
        if let Some(progress) = &self.progress {
            request.progress = progress.clone();
        }
        if let Some(error_message) = &self.error_message {
            request.error_message = Some(error_message.clone());
        }
        if let Some(video_id) = &self.video_id {
            request.video_id = Some(video_id.clone());
        }
        if let Some(local_path) = &self.local_path {
            request.local_path = Some(local_path.clone());
        }
        Ok(())
    }
}
