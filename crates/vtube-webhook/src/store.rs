//! Record store wiring.

use async_trait::async_trait;

use vtube_firestore::{FirestoreResult, VideoRepository};
use vtube_models::{VideoId, VideoPatch, VideoRecord};

use crate::reconcile::RecordStore;

#[async_trait]
impl RecordStore for VideoRepository {
    async fn find_by_upload_id(&self, upload_id: &str) -> FirestoreResult<Option<VideoRecord>> {
        VideoRepository::find_by_upload_id(self, upload_id).await
    }

    async fn find_by_asset_id(&self, asset_id: &str) -> FirestoreResult<Option<VideoRecord>> {
        VideoRepository::find_by_asset_id(self, asset_id).await
    }

    async fn update_fields(&self, video_id: &VideoId, patch: &VideoPatch) -> FirestoreResult<()> {
        VideoRepository::update_fields(self, video_id, patch).await
    }

    async fn delete(&self, video_id: &VideoId) -> FirestoreResult<()> {
        VideoRepository::delete(self, video_id).await
    }
}
