//! Firestore-backed store.
//!
//! Updates are read-modify-write cycles guarded by the document's
//! `updateTime`, so a concurrent writer forces a re-read instead of a lost
//! update. Claiming the next queued import uses the same guard: two workers
//! racing for one row cannot both win.

use std::collections::HashMap;

use async_trait::async_trait;
use reel_models::{
    CloudConnection, CloudProvider, ImportRequest, ImportRequestId, ImportStatus, ImportUpdate, Video, VideoId,
    VideoUpdate,
};
use tracing::{debug, info};

use crate::client::FirestoreClient;
use crate::codec::{
    connection_doc_id, connection_from_document, connection_to_fields, import_from_document, import_to_fields,
    video_from_document, video_to_fields,
};
use crate::error::{StoreError, StoreResult};
use crate::metrics::record_claim_conflict;
use crate::store::{ConnectionStore, ImportStore, VideoStore};
use crate::types::{Document, Filter, Order, StructuredQuery, ToFirestoreValue, Value};

const VIDEOS: &str = "videos";
const IMPORTS: &str = "import_requests";
const CONNECTIONS: &str = "cloud_connections";

/// Attempts before giving up on a contended document.
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Queued candidates fetched per claim; later ones cover lost races.
const CLAIM_CANDIDATES: u32 = 5;

const LIST_LIMIT: u32 = 200;

pub struct FirestoreStore {
    client: FirestoreClient,
}

impl FirestoreStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn from_env() -> StoreResult<Self> {
        Ok(Self::new(FirestoreClient::from_env().await?))
    }

    /// Read `collection/id`, let `mutate` change the decoded model, and write it
    /// back only if nobody else wrote in between.
    async fn compare_and_swap<T, D, M, E>(
        &self,
        collection: &str,
        id: &str,
        decode: D,
        mutate: M,
        encode: E,
    ) -> StoreResult<T>
    where
        D: Fn(&Document) -> StoreResult<T>,
        M: Fn(&mut T) -> StoreResult<()>,
        E: Fn(&T) -> HashMap<String, Value>,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let doc = self
                .client
                .get_document(collection, id)
                .await?
                .ok_or_else(|| StoreError::not_found(format!("{}/{}", collection, id)))?;

            let mut model = decode(&doc)?;
            mutate(&mut model)?;

            match self
                .client
                .replace_document(collection, id, encode(&model), doc.update_time.as_deref())
                .await
            {
                Ok(_) => return Ok(model),
                Err(e) if e.is_precondition_failed() => {
                    debug!(collection, id, attempt, "Concurrent write detected, re-reading");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::PreconditionFailed(format!(
            "{}/{} still contended after {} attempts",
            collection, id, MAX_CAS_ATTEMPTS
        )))
    }
}

#[async_trait]
impl VideoStore for FirestoreStore {
    async fn create_video(&self, video: &Video) -> StoreResult<()> {
        self.client
            .create_document(VIDEOS, video.id.as_str(), video_to_fields(video))
            .await?;
        info!("Created video record: {}", video.id);
        Ok(())
    }

    async fn get_video(&self, id: &VideoId) -> StoreResult<Option<Video>> {
        match self.client.get_document(VIDEOS, id.as_str()).await? {
            Some(doc) => Ok(Some(video_from_document(&doc, id)?)),
            None => Ok(None),
        }
    }

    async fn update_video(&self, id: &VideoId, update: &VideoUpdate) -> StoreResult<Video> {
        self.compare_and_swap(
            VIDEOS,
            id.as_str(),
            |doc| video_from_document(doc, id),
            |video| Ok(update.apply(video)?),
            video_to_fields,
        )
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client.get_document("health", "ping").await.map(|_| ())
    }
}

#[async_trait]
impl ImportStore for FirestoreStore {
    async fn enqueue(&self, requests: &[ImportRequest]) -> StoreResult<()> {
        for request in requests {
            self.client
                .create_document(IMPORTS, request.id.as_str(), import_to_fields(request))
                .await?;
        }
        info!("Enqueued {} import request(s)", requests.len());
        Ok(())
    }

    async fn get_import(&self, id: &ImportRequestId) -> StoreResult<Option<ImportRequest>> {
        match self.client.get_document(IMPORTS, id.as_str()).await? {
            Some(doc) => Ok(Some(import_from_document(&doc)?)),
            None => Ok(None),
        }
    }

    async fn list_imports(&self, user_id: &str) -> StoreResult<Vec<ImportRequest>> {
        let query = StructuredQuery::collection(IMPORTS)
            .filter(Filter::equal("user_id", user_id.to_firestore_value()))
            .order_by(Order::descending("created_at"))
            .limit(LIST_LIMIT);

        let docs = self.client.run_query(query).await?;
        docs.iter().map(import_from_document).collect()
    }

    async fn claim_next_queued(&self) -> StoreResult<Option<ImportRequest>> {
        let query = StructuredQuery::collection(IMPORTS)
            .filter(Filter::equal("status", ImportStatus::Queued.as_str().to_firestore_value()))
            .order_by(Order::ascending("created_at"))
            .limit(CLAIM_CANDIDATES);

        for doc in self.client.run_query(query).await? {
            let mut request = import_from_document(&doc)?;
            if ImportUpdate::status(ImportStatus::Downloading)
                .apply(&mut request)
                .is_err()
            {
                continue;
            }

            match self
                .client
                .replace_document(
                    IMPORTS,
                    request.id.as_str(),
                    import_to_fields(&request),
                    doc.update_time.as_deref(),
                )
                .await
            {
                Ok(_) => return Ok(Some(request)),
                Err(e) if e.is_precondition_failed() => {
                    record_claim_conflict();
                    debug!(import_id = %request.id, "Lost claim race, trying next candidate");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn update_import(&self, id: &ImportRequestId, update: &ImportUpdate) -> StoreResult<ImportRequest> {
        self.compare_and_swap(
            IMPORTS,
            id.as_str(),
            import_from_document,
            |request| Ok(update.apply(request)?),
            import_to_fields,
        )
        .await
    }

    async fn cancel_import(&self, id: &ImportRequestId, user_id: &str) -> StoreResult<ImportRequest> {
        self.compare_and_swap(
            IMPORTS,
            id.as_str(),
            import_from_document,
            |request| {
                if request.user_id != user_id {
                    return Err(StoreError::not_found(format!("{}/{}", IMPORTS, id)));
                }
                Ok(ImportUpdate::status(ImportStatus::Cancelled).apply(request)?)
            },
            import_to_fields,
        )
        .await
    }
}

#[async_trait]
impl ConnectionStore for FirestoreStore {
    async fn get_connection(&self, user_id: &str, provider: CloudProvider) -> StoreResult<Option<CloudConnection>> {
        let doc_id = connection_doc_id(user_id, provider);
        match self.client.get_document(CONNECTIONS, &doc_id).await? {
            Some(doc) => Ok(Some(connection_from_document(&doc)?)),
            None => Ok(None),
        }
    }

    async fn save_connection(&self, connection: &CloudConnection) -> StoreResult<()> {
        let doc_id = connection_doc_id(&connection.user_id, connection.provider);
        let fields = connection_to_fields(connection);
        match self.client.get_document(CONNECTIONS, &doc_id).await? {
            Some(existing) => {
                self.client
                    .replace_document(CONNECTIONS, &doc_id, fields, existing.update_time.as_deref())
                    .await?;
            }
            None => {
                self.client.create_document(CONNECTIONS, &doc_id, fields).await?;
            }
        }
        Ok(())
    }
}
