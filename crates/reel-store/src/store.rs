//! Store traits shared by the API and the pipeline.

use async_trait::async_trait;
use reel_models::{
    CloudConnection, CloudProvider, ImportRequest, ImportRequestId, ImportUpdate, Video, VideoId, VideoUpdate,
};

use crate::error::StoreResult;

/// Video records.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create_video(&self, video: &Video) -> StoreResult<()>;

    async fn get_video(&self, id: &VideoId) -> StoreResult<Option<Video>>;

    /// Apply `update` atomically and return the stored result.
    ///
    /// Fails with `NotFound` for unknown ids and with `Model` when the update
    /// breaks a status transition or the trim invariant.
    async fn update_video(&self, id: &VideoId, update: &VideoUpdate) -> StoreResult<Video>;

    /// Backend reachability, for readiness checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// The persistent import queue.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Insert `queued` requests.
    async fn enqueue(&self, requests: &[ImportRequest]) -> StoreResult<()>;

    async fn get_import(&self, id: &ImportRequestId) -> StoreResult<Option<ImportRequest>>;

    /// A user's requests, newest first.
    async fn list_imports(&self, user_id: &str) -> StoreResult<Vec<ImportRequest>>;

    /// Atomically move the oldest `queued` request to `downloading` and return it.
    ///
    /// Two concurrent callers never receive the same request.
    async fn claim_next_queued(&self) -> StoreResult<Option<ImportRequest>>;

    async fn update_import(&self, id: &ImportRequestId, update: &ImportUpdate) -> StoreResult<ImportRequest>;

    /// Cancel a request owned by `user_id`. Only `queued` requests can be cancelled.
    async fn cancel_import(&self, id: &ImportRequestId, user_id: &str) -> StoreResult<ImportRequest>;
}

/// Linked cloud-storage accounts.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn get_connection(&self, user_id: &str, provider: CloudProvider) -> StoreResult<Option<CloudConnection>>;

    async fn save_connection(&self, connection: &CloudConnection) -> StoreResult<()>;
}
