//! Typed repository for video records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use vtube_models::{ProcessingStatus, VideoId, VideoPatch, VideoRecord};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};

/// Firestore collection holding video records.
const COLLECTION: &str = "videos";

/// Repository for video documents.
///
/// Lookups by upload id are only valid before the provider assigns an asset
/// id; track events correlate by asset id exclusively.
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
}

impl VideoRepository {
    /// Create a new video repository.
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Get a video by ID.
    pub async fn get(&self, video_id: &VideoId) -> FirestoreResult<Option<VideoRecord>> {
        let doc = self
            .client
            .with_retry("get_video", || {
                self.client.get_document(COLLECTION, video_id.as_str())
            })
            .await?;

        doc.map(|d| document_to_record(&d)).transpose()
    }

    /// Find the record whose upload correlation id matches.
    pub async fn find_by_upload_id(&self, upload_id: &str) -> FirestoreResult<Option<VideoRecord>> {
        self.find_one("mux_upload_id", upload_id).await
    }

    /// Find the record whose provider asset id matches.
    pub async fn find_by_asset_id(&self, asset_id: &str) -> FirestoreResult<Option<VideoRecord>> {
        self.find_one("mux_asset_id", asset_id).await
    }

    async fn find_one(&self, field: &str, value: &str) -> FirestoreResult<Option<VideoRecord>> {
        let docs = self
            .client
            .with_retry("find_video", || {
                self.client.run_query(StructuredQuery::equals(
                    COLLECTION,
                    field,
                    Value::StringValue(value.to_string()),
                    1,
                ))
            })
            .await?;

        docs.first().map(document_to_record).transpose()
    }

    /// Apply a partial update as a single field-masked merge.
    ///
    /// Not retried: failed writes surface immediately and reconciliation is
    /// left to the provider's redelivery.
    pub async fn update_fields(&self, video_id: &VideoId, patch: &VideoPatch) -> FirestoreResult<()> {
        let (fields, mask) = patch_to_fields(patch);
        self.client
            .patch_document(COLLECTION, video_id.as_str(), fields, mask)
            .await?;
        Ok(())
    }

    /// Delete a video record.
    pub async fn delete(&self, video_id: &VideoId) -> FirestoreResult<()> {
        self.client
            .delete_document(COLLECTION, video_id.as_str())
            .await?;
        info!(video_id = %video_id, "Deleted video record");
        Ok(())
    }
}

/// Translate a patch into Firestore fields plus the matching update mask.
///
/// `updated_at` rides along on every write.
fn patch_to_fields(patch: &VideoPatch) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();

    if let Some(ref v) = patch.mux_asset_id {
        fields.insert("mux_asset_id".to_string(), v.to_firestore_value());
    }
    if let Some(ref v) = patch.mux_playback_id {
        fields.insert("mux_playback_id".to_string(), v.to_firestore_value());
    }
    if let Some(v) = patch.mux_status {
        fields.insert("mux_status".to_string(), v.as_str().to_firestore_value());
    }
    if let Some(ref v) = patch.mux_track_id {
        fields.insert("mux_track_id".to_string(), v.to_firestore_value());
    }
    if let Some(v) = patch.mux_track_status {
        fields.insert("mux_track_status".to_string(), v.as_str().to_firestore_value());
    }
    if let Some(ref a) = patch.thumbnail {
        fields.insert("thumbnail_url".to_string(), a.url.to_firestore_value());
        fields.insert("thumbnail_key".to_string(), a.key.to_firestore_value());
    }
    if let Some(ref a) = patch.preview {
        fields.insert("preview_url".to_string(), a.url.to_firestore_value());
        fields.insert("preview_key".to_string(), a.key.to_firestore_value());
    }
    if let Some(v) = patch.duration_ms {
        fields.insert("duration_ms".to_string(), v.to_firestore_value());
    }

    fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

    let mask = fields.keys().cloned().collect();
    (fields, mask)
}

/// Decode a Firestore document into a `VideoRecord`.
fn document_to_record(doc: &Document) -> FirestoreResult<VideoRecord> {
    let id = doc
        .doc_id()
        .ok_or_else(|| FirestoreError::invalid_response("video document has no resource name"))?;

    let get_string = |name: &str| -> Option<String> {
        doc.field(name).and_then(String::from_firestore_value)
    };
    let require_string = |name: &str| -> FirestoreResult<String> {
        get_string(name).ok_or_else(|| {
            FirestoreError::invalid_response(format!("video {} missing field {}", id, name))
        })
    };

    let mux_status = match get_string("mux_status") {
        Some(s) => s.parse::<ProcessingStatus>().map_err(|e| {
            FirestoreError::invalid_response(format!("video {}: {}", id, e))
        })?,
        None => ProcessingStatus::default(),
    };

    let mux_track_status = match get_string("mux_track_status") {
        Some(s) => Some(s.parse().map_err(|e| {
            FirestoreError::invalid_response(format!("video {}: {}", id, e))
        })?),
        None => None,
    };

    let timestamp = |name: &str| {
        doc.field(name)
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_else(Utc::now)
    };

    Ok(VideoRecord {
        id: VideoId::from_string(id),
        user_id: require_string("user_id")?,
        title: require_string("title")?,
        description: get_string("description"),
        mux_upload_id: require_string("mux_upload_id")?,
        mux_asset_id: get_string("mux_asset_id"),
        mux_playback_id: get_string("mux_playback_id"),
        mux_status,
        mux_track_id: get_string("mux_track_id"),
        mux_track_status,
        thumbnail_url: get_string("thumbnail_url"),
        thumbnail_key: get_string("thumbnail_key"),
        preview_url: get_string("preview_url"),
        preview_key: get_string("preview_key"),
        duration_ms: doc
            .field("duration_ms")
            .and_then(u64::from_firestore_value)
            .unwrap_or(0),
        created_at: timestamp("created_at"),
        updated_at: timestamp("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtube_models::AssetRef;

    fn string_field(v: &str) -> Value {
        Value::StringValue(v.to_string())
    }

    #[test]
    fn test_patch_mask_matches_fields() {
        let patch = VideoPatch::new()
            .asset_id("asset_1")
            .status(ProcessingStatus::Preparing);

        let (fields, mask) = patch_to_fields(&patch);

        assert_eq!(fields.len(), 3); // asset id, status, updated_at
        assert_eq!(mask.len(), 3);
        for name in &mask {
            assert!(fields.contains_key(name));
        }
        assert!(fields.contains_key("updated_at"));
    }

    #[test]
    fn test_patch_writes_asset_pairs_together() {
        let patch = VideoPatch::new()
            .thumbnail(AssetRef::new("https://cdn.example/t.jpg", "mux/p/thumbnail.jpg"))
            .preview(AssetRef::new("https://cdn.example/p.gif", "mux/p/preview.gif"));

        let (fields, _) = patch_to_fields(&patch);

        assert!(fields.contains_key("thumbnail_url"));
        assert!(fields.contains_key("thumbnail_key"));
        assert!(fields.contains_key("preview_url"));
        assert!(fields.contains_key("preview_key"));
    }

    #[test]
    fn test_document_to_record() {
        let mut fields = HashMap::new();
        fields.insert("user_id".to_string(), string_field("user_1"));
        fields.insert("title".to_string(), string_field("My Video"));
        fields.insert("mux_upload_id".to_string(), string_field("up_1"));
        fields.insert("mux_status".to_string(), string_field("ready"));
        fields.insert("duration_ms".to_string(), Value::IntegerValue("4500".to_string()));

        let doc = Document {
            name: Some("projects/p/databases/(default)/documents/videos/vid_1".to_string()),
            fields: Some(fields),
            create_time: None,
            update_time: None,
        };

        let record = document_to_record(&doc).unwrap();
        assert_eq!(record.id.as_str(), "vid_1");
        assert_eq!(record.mux_status, ProcessingStatus::Ready);
        assert_eq!(record.duration_ms, 4500);
        assert!(record.mux_asset_id.is_none());
    }

    #[test]
    fn test_document_with_unknown_status_is_rejected() {
        let mut fields = HashMap::new();
        fields.insert("user_id".to_string(), string_field("user_1"));
        fields.insert("title".to_string(), string_field("My Video"));
        fields.insert("mux_upload_id".to_string(), string_field("up_1"));
        fields.insert("mux_status".to_string(), string_field("exploded"));

        let doc = Document {
            name: Some("projects/p/databases/(default)/documents/videos/vid_1".to_string()),
            fields: Some(fields),
            create_time: None,
            update_time: None,
        };

        assert!(matches!(
            document_to_record(&doc),
            Err(FirestoreError::InvalidResponse(_))
        ));
    }
}
