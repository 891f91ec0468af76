//! In-memory store for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use reel_models::{
    CloudConnection, CloudProvider, ImportRequest, ImportRequestId, ImportStatus, ImportUpdate, Video, VideoId,
    VideoUpdate,
};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::{ConnectionStore, ImportStore, VideoStore};

/// Imports keyed by id, with an insertion sequence to break `created_at` ties.
#[derive(Default)]
struct ImportTable {
    rows: HashMap<ImportRequestId, (u64, ImportRequest)>,
    next_seq: u64,
}

/// Process-local implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    videos: RwLock<HashMap<VideoId, Video>>,
    imports: RwLock<ImportTable>,
    connections: RwLock<HashMap<(String, CloudProvider), CloudConnection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn create_video(&self, video: &Video) -> StoreResult<()> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&video.id) {
            return Err(StoreError::AlreadyExists(format!("videos/{}", video.id)));
        }
        videos.insert(video.id.clone(), video.clone());
        Ok(())
    }

    async fn get_video(&self, id: &VideoId) -> StoreResult<Option<Video>> {
        Ok(self.videos.read().await.get(id).cloned())
    }

    async fn update_video(&self, id: &VideoId, update: &VideoUpdate) -> StoreResult<Video> {
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("videos/{}", id)))?;
        let mut next = video.clone();
        update.apply(&mut next)?;
        *video = next.clone();
        Ok(next)
    }
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn enqueue(&self, requests: &[ImportRequest]) -> StoreResult<()> {
        let mut table = self.imports.write().await;
        if let Some(dup) = requests.iter().find(|r| table.rows.contains_key(&r.id)) {
            return Err(StoreError::AlreadyExists(format!("import_requests/{}", dup.id)));
        }
        for request in requests {
            let seq = table.next_seq;
            table.next_seq += 1;
            table.rows.insert(request.id.clone(), (seq, request.clone()));
        }
        Ok(())
    }

    async fn get_import(&self, id: &ImportRequestId) -> StoreResult<Option<ImportRequest>> {
        Ok(self.imports.read().await.rows.get(id).map(|(_, r)| r.clone()))
    }

    async fn list_imports(&self, user_id: &str) -> StoreResult<Vec<ImportRequest>> {
        let table = self.imports.read().await;
        let mut rows: Vec<_> = table
            .rows
            .values()
            .filter(|(_, r)| r.user_id == user_id)
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(rows.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn claim_next_queued(&self) -> StoreResult<Option<ImportRequest>> {
        let mut table = self.imports.write().await;
        let oldest = table
            .rows
            .values()
            .filter(|(_, r)| r.status == ImportStatus::Queued)
            .min_by(|(sa, a), (sb, b)| a.created_at.cmp(&b.created_at).then(sa.cmp(sb)))
            .map(|(_, r)| r.id.clone());

        let Some(id) = oldest else {
            return Ok(None);
        };
        let Some((_, request)) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        ImportUpdate::status(ImportStatus::Downloading).apply(request)?;
        Ok(Some(request.clone()))
    }

    async fn update_import(&self, id: &ImportRequestId, update: &ImportUpdate) -> StoreResult<ImportRequest> {
        let mut table = self.imports.write().await;
        let (_, request) = table
            .rows
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("import_requests/{}", id)))?;
        let mut next = request.clone();
        update.apply(&mut next)?;
        *request = next.clone();
        Ok(next)
    }

    async fn cancel_import(&self, id: &ImportRequestId, user_id: &str) -> StoreResult<ImportRequest> {
        let mut table = self.imports.write().await;
        let (_, request) = table
            .rows
            .get_mut(id)
            .filter(|(_, r)| r.user_id == user_id)
            .ok_or_else(|| StoreError::not_found(format!("import_requests/{}", id)))?;
        let mut next = request.clone();
        ImportUpdate::status(ImportStatus::Cancelled).apply(&mut next)?;
        *request = next.clone();
        Ok(next)
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn get_connection(&self, user_id: &str, provider: CloudProvider) -> StoreResult<Option<CloudConnection>> {
        Ok(self
            .connections
            .read()
            .await
            .get(&(user_id.to_string(), provider))
            .cloned())
    }

    async fn save_connection(&self, connection: &CloudConnection) -> StoreResult<()> {
        self.connections
            .write()
            .await
            .insert((connection.user_id.clone(), connection.provider), connection.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::{CloudFile, ModelError, VideoSource, VideoStatus};
    use std::sync::Arc;

    fn request(user: &str, name: &str) -> ImportRequest {
        let file = CloudFile {
            path: format!("/{}", name),
            name: name.to_string(),
            size: 1,
        };
        ImportRequest::new(user, CloudProvider::Dropbox, &file)
    }

    #[tokio::test]
    async fn test_claim_is_fifo() {
        let store = MemoryStore::new();
        let first = request("u1", "a.mp4");
        let second = request("u1", "b.mp4");
        store.enqueue(&[first.clone(), second.clone()]).await.unwrap();

        let claimed = store.claim_next_queued().await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.status, ImportStatus::Downloading);
        assert!(claimed.started_at.is_some());

        let claimed = store.claim_next_queued().await.unwrap().unwrap();
        assert_eq!(claimed.id, second.id);
        assert!(store.claim_next_queued().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fifo_with_identical_timestamps() {
        let store = MemoryStore::new();
        let first = request("u1", "a.mp4");
        let mut second = request("u1", "b.mp4");
        second.created_at = first.created_at;
        store.enqueue(&[first.clone(), second]).await.unwrap();

        assert_eq!(store.claim_next_queued().await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_concurrent_claims_never_share_a_row() {
        let store = Arc::new(MemoryStore::new());
        store.enqueue(&[request("u1", "only.mp4")]).await.unwrap();

        let (a, b) = tokio::join!(
            {
                let store = Arc::clone(&store);
                async move { store.claim_next_queued().await.unwrap() }
            },
            {
                let store = Arc::clone(&store);
                async move { store.claim_next_queued().await.unwrap() }
            }
        );
        assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
    }

    #[tokio::test]
    async fn test_cancel_only_while_queued() {
        let store = MemoryStore::new();
        let queued = request("u1", "a.mp4");
        let claimed = request("u1", "b.mp4");
        store.enqueue(&[claimed.clone()]).await.unwrap();
        store.claim_next_queued().await.unwrap();
        store.enqueue(&[queued.clone()]).await.unwrap();

        let cancelled = store.cancel_import(&queued.id, "u1").await.unwrap();
        assert_eq!(cancelled.status, ImportStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());

        let err = store.cancel_import(&claimed.id, "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Model(ModelError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_cancel_requires_owner() {
        let store = MemoryStore::new();
        let req = request("u1", "a.mp4");
        store.enqueue(&[req.clone()]).await.unwrap();
        let err = store.cancel_import(&req.id, "intruder").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancelled_rows_are_not_claimed() {
        let store = MemoryStore::new();
        let req = request("u1", "a.mp4");
        store.enqueue(&[req.clone()]).await.unwrap();
        store.cancel_import(&req.id, "u1").await.unwrap();
        assert!(store.claim_next_queued().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_imports_newest_first_and_scoped() {
        let store = MemoryStore::new();
        let older = request("u1", "a.mp4");
        let mut newer = request("u1", "b.mp4");
        newer.created_at = older.created_at + chrono::Duration::seconds(1);
        store.enqueue(&[older.clone(), newer.clone(), request("u2", "c.mp4")]).await.unwrap();

        let listed = store.list_imports("u1").await.unwrap();
        assert_eq!(listed.iter().map(|r| &r.id).collect::<Vec<_>>(), vec![&newer.id, &older.id]);
    }

    #[tokio::test]
    async fn test_failed_video_update_leaves_record_untouched() {
        let store = MemoryStore::new();
        let video = Video::new("u1", "/tmp/a.mp4", VideoSource::Upload);
        store.create_video(&video).await.unwrap();

        let err = store
            .update_video(&video.id, &VideoUpdate::status(VideoStatus::Published))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Model(_)));
        let stored = store.get_video(&video.id).await.unwrap().unwrap();
        assert_eq!(stored.status, VideoStatus::Uploading);
    }
}
