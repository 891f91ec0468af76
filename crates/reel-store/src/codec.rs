//! Mapping between models and Firestore documents.
//!
//! Absent optional fields are omitted rather than written as null, so a full
//! document replace clears them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reel_models::{
    CloudConnection, CloudProvider, ImportRequest, ImportRequestId, ImportStatus, Video, VideoId,
    VideoSource, VideoStatus,
};

use crate::error::{StoreError, StoreResult};
use crate::types::{Document, ToFirestoreValue, Value};

/// Field map under construction.
#[derive(Default)]
struct Fields(HashMap<String, Value>);

impl Fields {
    fn set(&mut self, key: &str, value: impl ToFirestoreValue) -> &mut Self {
        self.0.insert(key.to_string(), value.to_firestore_value());
        self
    }

    fn set_opt<T: ToFirestoreValue>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    fn into_inner(self) -> HashMap<String, Value> {
        self.0
    }
}

fn required<T: crate::types::FromFirestoreValue>(doc: &Document, field: &str) -> StoreResult<T> {
    doc.get(field)
        .ok_or_else(|| StoreError::invalid_document(format!("missing or invalid field '{}'", field)))
}

pub fn video_to_fields(video: &Video) -> HashMap<String, Value> {
    let mut f = Fields::default();
    f.set("user_id", video.user_id.as_str())
        .set("status", video.status.as_str())
        .set("source", video.source.as_str())
        .set("storage_path", video.storage_path.as_str())
        .set_opt("transcript", video.transcript.clone())
        .set_opt("duration_ms", video.duration_ms)
        .set("trim_start_ms", video.trim_start_ms)
        .set_opt("trim_end_ms", video.trim_end_ms)
        .set_opt("suggested_start_ms", video.suggested_start_ms)
        .set_opt("suggested_end_ms", video.suggested_end_ms)
        .set_opt("thumbnail", video.thumbnail.clone())
        .set_opt("platform_video_id", video.platform_video_id.clone())
        .set_opt("platform_url", video.platform_url.clone())
        .set_opt("error_message", video.error_message.clone())
        .set_opt("parent_video_id", video.parent_video_id.as_ref().map(|id| id.0.clone()))
        .set_opt("clip_start_sec", video.clip_start_sec)
        .set_opt("clip_end_sec", video.clip_end_sec)
        .set_opt("title", video.title.clone())
        .set_opt("description", video.description.clone())
        .set("tags", video.tags.clone())
        .set("created_at", video.created_at)
        .set("updated_at", video.updated_at);
    f.into_inner()
}

pub fn video_from_document(doc: &Document, id: &VideoId) -> StoreResult<Video> {
    let status: String = required(doc, "status")?;
    let status = VideoStatus::parse(&status)
        .ok_or_else(|| StoreError::invalid_document(format!("unknown video status '{}'", status)))?;
    let source = doc
        .get::<String>("source")
        .and_then(|s| VideoSource::parse(&s))
        .unwrap_or_default();

    Ok(Video {
        id: id.clone(),
        user_id: required(doc, "user_id")?,
        status,
        source,
        storage_path: required(doc, "storage_path")?,
        transcript: doc.get("transcript"),
        duration_ms: doc.get("duration_ms"),
        trim_start_ms: doc.get("trim_start_ms").unwrap_or(0),
        trim_end_ms: doc.get("trim_end_ms"),
        suggested_start_ms: doc.get("suggested_start_ms"),
        suggested_end_ms: doc.get("suggested_end_ms"),
        thumbnail: doc.get("thumbnail"),
        platform_video_id: doc.get("platform_video_id"),
        platform_url: doc.get("platform_url"),
        error_message: doc.get("error_message"),
        parent_video_id: doc.get::<String>("parent_video_id").map(VideoId::from),
        clip_start_sec: doc.get("clip_start_sec"),
        clip_end_sec: doc.get("clip_end_sec"),
        title: doc.get("title"),
        description: doc.get("description"),
        tags: doc.get("tags").unwrap_or_default(),
        created_at: doc.get("created_at").unwrap_or_else(Utc::now),
        updated_at: doc.get("updated_at").unwrap_or_else(Utc::now),
    })
}

pub fn import_to_fields(request: &ImportRequest) -> HashMap<String, Value> {
    let mut f = Fields::default();
    f.set("user_id", request.user_id.as_str())
        .set("provider", request.provider.as_str())
        .set("source_path", request.source_path.as_str())
        .set("source_name", request.source_name.as_str())
        .set("source_size", request.source_size)
        .set("status", request.status.as_str())
        .set_opt("error_message", request.error_message.clone())
        .set_opt("video_id", request.video_id.as_ref().map(|id| id.0.clone()))
        .set_opt("local_path", request.local_path.clone())
        .set("created_at", request.created_at)
        .set_opt("started_at", request.started_at)
        .set_opt("completed_at", request.completed_at);
    if !request.progress.is_null() {
        f.set("progress", request.progress.to_string());
    }
    f.into_inner()
}

pub fn import_from_document(doc: &Document) -> StoreResult<ImportRequest> {
    let id = doc
        .id()
        .ok_or_else(|| StoreError::invalid_document("import request without a name"))?;
    let status: String = required(doc, "status")?;
    let status = ImportStatus::parse(&status)
        .ok_or_else(|| StoreError::invalid_document(format!("unknown import status '{}'", status)))?;
    let provider: String = required(doc, "provider")?;
    let provider = CloudProvider::parse(&provider)
        .ok_or_else(|| StoreError::invalid_document(format!("unknown provider '{}'", provider)))?;

    Ok(ImportRequest {
        id: ImportRequestId::from_string(id),
        user_id: required(doc, "user_id")?,
        provider,
        source_path: required(doc, "source_path")?,
        source_name: doc.get("source_name").unwrap_or_default(),
        source_size: doc.get("source_size").unwrap_or(0),
        status,
        progress: doc
            .get::<String>("progress")
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or(serde_json::Value::Null),
        error_message: doc.get("error_message"),
        video_id: doc.get::<String>("video_id").map(VideoId::from),
        local_path: doc.get("local_path"),
        created_at: required::<DateTime<Utc>>(doc, "created_at")?,
        started_at: doc.get("started_at"),
        completed_at: doc.get("completed_at"),
    })
}

pub fn connection_to_fields(conn: &CloudConnection) -> HashMap<String, Value> {
    let mut f = Fields::default();
    f.set("user_id", conn.user_id.as_str())
        .set("provider", conn.provider.as_str())
        .set("access_token", conn.access_token.as_str())
        .set_opt("account_id", conn.account_id.clone())
        .set("connected_at", conn.connected_at);
    f.into_inner()
}

pub fn connection_from_document(doc: &Document) -> StoreResult<CloudConnection> {
    let provider: String = required(doc, "provider")?;
    Ok(CloudConnection {
        user_id: required(doc, "user_id")?,
        provider: CloudProvider::parse(&provider)
            .ok_or_else(|| StoreError::invalid_document(format!("unknown provider '{}'", provider)))?,
        access_token: required(doc, "access_token")?,
        account_id: doc.get("account_id"),
        connected_at: doc.get("connected_at").unwrap_or_else(Utc::now),
    })
}

/// Document id for a user's connection to a provider.
pub fn connection_doc_id(user_id: &str, provider: CloudProvider) -> String {
    format!("{}_{}", user_id, provider.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::{CloudFile, TrimRange, VideoUpdate};

    fn as_document(fields: HashMap<String, Value>, id: &str) -> Document {
        let mut doc = Document::new(fields);
        doc.name = Some(format!("projects/p/databases/(default)/documents/c/{}", id));
        doc
    }

    #[test]
    fn test_video_document_preserves_pipeline_fields() {
        let mut video = Video::new("user-1", "/tmp/a.mp4", VideoSource::CloudImport);
        VideoUpdate::status(VideoStatus::Transcribing)
            .with_trim(TrimRange::new(5000, Some(65000)).unwrap())
            .with_transcript("1\n00:00:01,000 --> 00:00:02,000\nhi\n")
            .apply(&mut video)
            .unwrap();
        video.tags = vec!["a".into(), "b".into()];

        let doc = as_document(video_to_fields(&video), video.id.as_str());
        let decoded = video_from_document(&doc, &video.id).unwrap();

        assert_eq!(decoded.status, VideoStatus::Transcribing);
        assert_eq!(decoded.source, VideoSource::CloudImport);
        assert_eq!(decoded.trim(), video.trim());
        assert_eq!(decoded.transcript, video.transcript);
        assert_eq!(decoded.tags, video.tags);
        assert!(decoded.error_message.is_none());
    }

    #[test]
    fn test_cleared_fields_are_omitted() {
        let video = Video::new("user-1", "/tmp/a.mp4", VideoSource::Upload);
        let fields = video_to_fields(&video);
        assert!(!fields.contains_key("error_message"));
        assert!(!fields.contains_key("trim_end_ms"));
    }

    #[test]
    fn test_import_document_decodes_id_from_name() {
        let file = CloudFile {
            path: "/a.mp4".into(),
            name: "a.mp4".into(),
            size: 9,
        };
        let mut request = ImportRequest::new("user-1", CloudProvider::Dropbox, &file);
        request.progress = serde_json::json!({"stage": "download"});

        let doc = as_document(import_to_fields(&request), request.id.as_str());
        let decoded = import_from_document(&doc).unwrap();
        assert_eq!(decoded.id, request.id);
        assert_eq!(decoded.status, ImportStatus::Queued);
        assert_eq!(decoded.progress["stage"], "download");
        assert_eq!(decoded.source_size, 9);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), "exploded".to_firestore_value());
        let doc = as_document(fields, "x");
        assert!(matches!(
            video_from_document(&doc, &VideoId::from("x")),
            Err(StoreError::InvalidDocument(_))
        ));
    }
}
