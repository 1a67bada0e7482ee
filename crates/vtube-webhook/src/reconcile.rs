//! State reconciliation for classified webhook events.
//!
//! Each event variant becomes one minimal, field-masked update against the
//! record store. The store provides atomic single-document merge semantics,
//! so every arm is a single conditional update; no locks are held here, and
//! none survive across the mirror's network I/O.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use vtube_firestore::FirestoreResult;
use vtube_models::{VideoId, VideoPatch, VideoRecord};
use vtube_storage::{MirroredAssets, StorageResult};

use crate::error::{WebhookError, WebhookResult};
use crate::event::WebhookEvent;

/// Record store operations the reconciler needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_upload_id(&self, upload_id: &str) -> FirestoreResult<Option<VideoRecord>>;
    async fn find_by_asset_id(&self, asset_id: &str) -> FirestoreResult<Option<VideoRecord>>;
    async fn update_fields(&self, video_id: &VideoId, patch: &VideoPatch) -> FirestoreResult<()>;
    async fn delete(&self, video_id: &VideoId) -> FirestoreResult<()>;
}

/// Asset mirroring operations the reconciler needs.
#[async_trait]
pub trait AssetMirror: Send + Sync {
    /// Mirror the playback's thumbnail and animated preview into owned
    /// storage, returning both stored references.
    async fn mirror_playback_assets(&self, playback_id: &str) -> StorageResult<MirroredAssets>;

    /// Delete a previously mirrored object.
    async fn delete_by_key(&self, key: &str) -> StorageResult<()>;
}

/// What a successfully processed event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A record was partially updated.
    Applied,
    /// A record was deleted.
    Deleted,
    /// The event type is not handled; nothing was touched.
    Ignored,
}

impl ReconcileOutcome {
    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied => "applied",
            ReconcileOutcome::Deleted => "deleted",
            ReconcileOutcome::Ignored => "ignored",
        }
    }
}

/// Applies classified events to the video record store.
///
/// Events may be redelivered or arrive out of order; every arm is an
/// idempotent overwrite and `mux_status` is last-write-wins. Redelivery is
/// therefore safe without an event-id dedup ledger — mirrored object keys
/// are deterministic, so a replayed AssetReady overwrites in place.
#[derive(Clone)]
pub struct Reconciler<S, M> {
    store: S,
    mirror: M,
}

impl<S: RecordStore, M: AssetMirror> Reconciler<S, M> {
    pub fn new(store: S, mirror: M) -> Self {
        Self { store, mirror }
    }

    /// Apply one event. Returns what happened, or the error the dispatcher
    /// maps to a response; partial effects never commit to the record.
    pub async fn apply(&self, event: &WebhookEvent) -> WebhookResult<ReconcileOutcome> {
        match event {
            WebhookEvent::AssetCreated {
                asset_id,
                status,
                upload_id,
            } => {
                let record = self.require_by_upload_id(upload_id).await?;

                let patch = VideoPatch::new().asset_id(asset_id).status(*status);
                self.store.update_fields(&record.id, &patch).await?;

                info!(video_id = %record.id, %asset_id, "Asset created");
                Ok(ReconcileOutcome::Applied)
            }

            WebhookEvent::AssetReady {
                asset_id,
                status,
                upload_id,
                playback_id,
                duration_seconds,
            } => {
                let record = self.require_by_upload_id(upload_id).await?;

                let duration_ms = duration_seconds
                    .map(|secs| (secs * 1000.0).round() as u64)
                    .unwrap_or(0);

                // Stage the mirrored copies first; the record only ever says
                // "ready" once both assets exist in owned storage.
                let assets = self.mirror.mirror_playback_assets(playback_id).await?;

                let patch = VideoPatch::new()
                    .status(*status)
                    .asset_id(asset_id)
                    .playback_id(playback_id)
                    .duration_ms(duration_ms)
                    .thumbnail(assets.thumbnail)
                    .preview(assets.preview);
                self.store.update_fields(&record.id, &patch).await?;

                info!(video_id = %record.id, %playback_id, duration_ms, "Asset ready");
                Ok(ReconcileOutcome::Applied)
            }

            WebhookEvent::AssetErrored { status, upload_id } => {
                let record = self.require_by_upload_id(upload_id).await?;

                let patch = VideoPatch::new().status(*status);
                self.store.update_fields(&record.id, &patch).await?;

                warn!(video_id = %record.id, "Asset errored");
                Ok(ReconcileOutcome::Applied)
            }

            WebhookEvent::AssetDeleted { upload_id } => {
                let record = self.require_by_upload_id(upload_id).await?;

                // The mirrored objects are ours, not the store's: clean them
                // up best-effort before the record goes away. The delete is
                // the authoritative effect and proceeds regardless.
                for key in [&record.thumbnail_key, &record.preview_key]
                    .into_iter()
                    .flatten()
                {
                    if let Err(e) = self.mirror.delete_by_key(key).await {
                        warn!(video_id = %record.id, %key, "Failed to delete mirrored object: {}", e);
                    }
                }

                self.store.delete(&record.id).await?;

                info!(video_id = %record.id, "Asset deleted, record removed");
                Ok(ReconcileOutcome::Deleted)
            }

            WebhookEvent::TrackReady {
                track_id,
                status,
                asset_id,
            } => {
                // Track events carry no upload id; the asset id is the only
                // valid correlation key here.
                let record = self
                    .store
                    .find_by_asset_id(asset_id)
                    .await?
                    .ok_or_else(|| WebhookError::not_found(asset_id.clone()))?;

                let patch = VideoPatch::new().track(track_id, *status);
                self.store.update_fields(&record.id, &patch).await?;

                info!(video_id = %record.id, %track_id, "Track ready");
                Ok(ReconcileOutcome::Applied)
            }

            WebhookEvent::Unhandled { event_type } => {
                debug!(%event_type, "Ignoring unhandled webhook event");
                Ok(ReconcileOutcome::Ignored)
            }
        }
    }

    async fn require_by_upload_id(&self, upload_id: &str) -> WebhookResult<VideoRecord> {
        self.store
            .find_by_upload_id(upload_id)
            .await?
            .ok_or_else(|| WebhookError::not_found(upload_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    use vtube_models::{AssetRef, ProcessingStatus, TrackStatus};
    use vtube_storage::StorageError;

    use super::*;
    use crate::event::classify;
    use crate::signature::{sign, SignatureVerifier};

    /// In-memory record store keyed by video id.
    #[derive(Default)]
    struct FakeStore {
        records: Mutex<HashMap<String, VideoRecord>>,
    }

    impl FakeStore {
        fn with_record(record: VideoRecord) -> Self {
            let store = Self::default();
            store
                .records
                .lock()
                .unwrap()
                .insert(record.id.as_str().to_string(), record);
            store
        }

        fn get(&self, id: &str) -> Option<VideoRecord> {
            self.records.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn find_by_upload_id(
            &self,
            upload_id: &str,
        ) -> FirestoreResult<Option<VideoRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|r| r.mux_upload_id == upload_id)
                .cloned())
        }

        async fn find_by_asset_id(&self, asset_id: &str) -> FirestoreResult<Option<VideoRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|r| r.mux_asset_id.as_deref() == Some(asset_id))
                .cloned())
        }

        async fn update_fields(
            &self,
            video_id: &VideoId,
            patch: &VideoPatch,
        ) -> FirestoreResult<()> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(video_id.as_str())
                .expect("update against missing record");
            patch.apply_to(record);
            Ok(())
        }

        async fn delete(&self, video_id: &VideoId) -> FirestoreResult<()> {
            self.records.lock().unwrap().remove(video_id.as_str());
            Ok(())
        }
    }

    /// Mirror fake with deterministic keys and a failure switch.
    #[derive(Default)]
    struct FakeMirror {
        fail: AtomicBool,
        mirror_calls: AtomicU32,
        deleted_keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetMirror for FakeMirror {
        async fn mirror_playback_assets(
            &self,
            playback_id: &str,
        ) -> StorageResult<MirroredAssets> {
            self.mirror_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StorageError::fetch_failed("image host unreachable"));
            }
            Ok(MirroredAssets {
                thumbnail: AssetRef::new(
                    format!("https://cdn.test/mux/{}/thumbnail.jpg", playback_id),
                    format!("mux/{}/thumbnail.jpg", playback_id),
                ),
                preview: AssetRef::new(
                    format!("https://cdn.test/mux/{}/preview.gif", playback_id),
                    format!("mux/{}/preview.gif", playback_id),
                ),
            })
        }

        async fn delete_by_key(&self, key: &str) -> StorageResult<()> {
            self.deleted_keys.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    fn preparing_record() -> VideoRecord {
        VideoRecord::new(
            VideoId::from_string("vid_1"),
            "user_1",
            "Untitled",
            "up_1",
        )
    }

    fn ready_event(duration: Option<f64>) -> WebhookEvent {
        WebhookEvent::AssetReady {
            asset_id: "asset_1".to_string(),
            status: ProcessingStatus::Ready,
            upload_id: "up_1".to_string(),
            playback_id: "play_1".to_string(),
            duration_seconds: duration,
        }
    }

    #[tokio::test]
    async fn test_created_then_ready_pipeline() {
        let store = FakeStore::with_record(preparing_record());
        let reconciler = Reconciler::new(store, FakeMirror::default());

        let created = WebhookEvent::AssetCreated {
            asset_id: "asset_1".to_string(),
            status: ProcessingStatus::Preparing,
            upload_id: "up_1".to_string(),
        };
        assert_eq!(
            reconciler.apply(&created).await.unwrap(),
            ReconcileOutcome::Applied
        );

        assert_eq!(
            reconciler.apply(&ready_event(Some(12.3456))).await.unwrap(),
            ReconcileOutcome::Applied
        );

        let record = reconciler.store.get("vid_1").unwrap();
        assert_eq!(record.mux_status, ProcessingStatus::Ready);
        assert_eq!(record.mux_asset_id.as_deref(), Some("asset_1"));
        assert_eq!(record.mux_playback_id.as_deref(), Some("play_1"));
        assert_eq!(record.duration_ms, 12346); // round(12.3456 * 1000)
        assert!(record.thumbnail().is_some());
        assert!(record.preview().is_some());
        assert_ne!(record.thumbnail_key, record.preview_key);
    }

    #[tokio::test]
    async fn test_ready_without_duration_defaults_to_zero() {
        let store = FakeStore::with_record(preparing_record());
        let reconciler = Reconciler::new(store, FakeMirror::default());

        reconciler.apply(&ready_event(None)).await.unwrap();

        assert_eq!(reconciler.store.get("vid_1").unwrap().duration_ms, 0);
    }

    #[tokio::test]
    async fn test_mirror_failure_leaves_record_untouched() {
        let store = FakeStore::with_record(preparing_record());
        let mirror = FakeMirror::default();
        mirror.fail.store(true, Ordering::SeqCst);
        let reconciler = Reconciler::new(store, mirror);

        let err = reconciler.apply(&ready_event(Some(5.0))).await.unwrap_err();
        assert!(matches!(err, WebhookError::Mirror(_)));

        let record = reconciler.store.get("vid_1").unwrap();
        assert_eq!(record.mux_status, ProcessingStatus::Preparing);
        assert!(record.thumbnail_url.is_none());
        assert!(record.thumbnail_key.is_none());
    }

    #[tokio::test]
    async fn test_errored_replay_is_idempotent() {
        let store = FakeStore::with_record(preparing_record());
        let reconciler = Reconciler::new(store, FakeMirror::default());

        let errored = WebhookEvent::AssetErrored {
            status: ProcessingStatus::Errored,
            upload_id: "up_1".to_string(),
        };

        reconciler.apply(&errored).await.unwrap();
        let first = reconciler.store.get("vid_1").unwrap();

        reconciler.apply(&errored).await.unwrap();
        let second = reconciler.store.get("vid_1").unwrap();

        assert_eq!(first.mux_status, ProcessingStatus::Errored);
        assert_eq!(second.mux_status, first.mux_status);
        assert_eq!(second.mux_asset_id, first.mux_asset_id);
        assert_eq!(second.duration_ms, first.duration_ms);
    }

    #[tokio::test]
    async fn test_deleted_removes_record_and_mirrored_objects() {
        let mut record = preparing_record();
        record.thumbnail_url = Some("https://cdn.test/t.jpg".to_string());
        record.thumbnail_key = Some("mux/play_1/thumbnail.jpg".to_string());
        record.preview_url = Some("https://cdn.test/p.gif".to_string());
        record.preview_key = Some("mux/play_1/preview.gif".to_string());

        let store = FakeStore::with_record(record);
        let reconciler = Reconciler::new(store, FakeMirror::default());

        let deleted = WebhookEvent::AssetDeleted {
            upload_id: "up_1".to_string(),
        };
        assert_eq!(
            reconciler.apply(&deleted).await.unwrap(),
            ReconcileOutcome::Deleted
        );

        assert!(reconciler.store.get("vid_1").is_none());
        assert!(matches!(
            reconciler.apply(&deleted).await.unwrap_err(),
            WebhookError::RecordNotFound(_)
        ));

        let deleted_keys = reconciler.mirror.deleted_keys.lock().unwrap();
        assert_eq!(deleted_keys.len(), 2);
    }

    #[tokio::test]
    async fn test_track_ready_correlates_by_asset_id_only() {
        // Record exists by upload id, but the asset id is still unset:
        // a track event must not find it.
        let store = FakeStore::with_record(preparing_record());
        let reconciler = Reconciler::new(store, FakeMirror::default());

        let track = WebhookEvent::TrackReady {
            track_id: "track_1".to_string(),
            status: TrackStatus::Ready,
            asset_id: "asset_1".to_string(),
        };

        assert!(matches!(
            reconciler.apply(&track).await.unwrap_err(),
            WebhookError::RecordNotFound(_)
        ));

        // Once the created event lands, the same track event applies.
        let created = WebhookEvent::AssetCreated {
            asset_id: "asset_1".to_string(),
            status: ProcessingStatus::Preparing,
            upload_id: "up_1".to_string(),
        };
        reconciler.apply(&created).await.unwrap();
        reconciler.apply(&track).await.unwrap();

        let record = reconciler.store.get("vid_1").unwrap();
        assert_eq!(record.mux_track_id.as_deref(), Some("track_1"));
        assert_eq!(record.mux_track_status, Some(TrackStatus::Ready));
        // Track events never touch the asset status
        assert_eq!(record.mux_status, ProcessingStatus::Preparing);
    }

    #[tokio::test]
    async fn test_unknown_record_yields_not_found() {
        let reconciler = Reconciler::new(FakeStore::default(), FakeMirror::default());

        let created = WebhookEvent::AssetCreated {
            asset_id: "asset_1".to_string(),
            status: ProcessingStatus::Preparing,
            upload_id: "up_ghost".to_string(),
        };

        assert!(matches!(
            reconciler.apply(&created).await.unwrap_err(),
            WebhookError::RecordNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_unhandled_event_touches_nothing() {
        let store = FakeStore::with_record(preparing_record());
        let reconciler = Reconciler::new(store, FakeMirror::default());

        let before = reconciler.store.get("vid_1").unwrap();
        let outcome = reconciler
            .apply(&WebhookEvent::Unhandled {
                event_type: "video.live_stream.active".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Ignored);
        let after = reconciler.store.get("vid_1").unwrap();
        assert_eq!(after.mux_status, before.mux_status);
        assert_eq!(reconciler.mirror.mirror_calls.load(Ordering::SeqCst), 0);
    }

    /// Full path from raw signed bytes: verify, classify, reconcile.
    #[tokio::test]
    async fn test_end_to_end_errored_event() {
        const SECRET: &str = "whsec_e2e";

        let body =
            br#"{"type":"video.asset.errored","data":{"status":"errored","upload_id":"up_1"}}"#;
        let header = sign(SECRET, chrono::Utc::now().timestamp(), body);

        let verifier = SignatureVerifier::new(SECRET);
        verifier.verify(body, &header).unwrap();

        let event = classify(body).unwrap();
        assert_eq!(event.kind(), "asset_errored");

        let store = FakeStore::with_record(preparing_record());
        let reconciler = Reconciler::new(store, FakeMirror::default());
        let outcome = reconciler.apply(&event).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied);
        let record = reconciler.store.get("vid_1").unwrap();
        assert_eq!(record.mux_status, ProcessingStatus::Errored);
        assert_eq!(record.mux_upload_id, "up_1");
        assert!(record.mux_asset_id.is_none());
        assert_eq!(record.duration_ms, 0);
    }
}
