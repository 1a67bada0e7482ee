//! Provider asset locations and the production mirror.
//!
//! Mux serves playback stills and animated previews from its image host,
//! addressed by playback id. Those URLs are transient from our point of
//! view (they die with the asset), so ready events mirror them into owned
//! storage under deterministic keys.

use async_trait::async_trait;
use tokio::try_join;

use vtube_storage::{MirroredAssets, ObjectMirror, StorageResult};

use crate::reconcile::AssetMirror;

/// Base URL of the provider's image host.
const MUX_IMAGE_BASE: &str = "https://image.mux.com";

/// Provider URL of the still thumbnail for a playback.
pub fn thumbnail_source_url(playback_id: &str) -> String {
    format!("{}/{}/thumbnail.jpg", MUX_IMAGE_BASE, playback_id)
}

/// Provider URL of the animated preview for a playback.
pub fn preview_source_url(playback_id: &str) -> String {
    format!("{}/{}/animated.gif", MUX_IMAGE_BASE, playback_id)
}

/// Storage key for the mirrored thumbnail. Deterministic per playback so a
/// redelivered ready event overwrites instead of orphaning objects.
pub fn thumbnail_key(playback_id: &str) -> String {
    format!("mux/{}/thumbnail.jpg", playback_id)
}

/// Storage key for the mirrored preview.
pub fn preview_key(playback_id: &str) -> String {
    format!("mux/{}/preview.gif", playback_id)
}

/// Mirrors Mux playback assets into R2.
#[derive(Clone)]
pub struct MuxAssetMirror {
    mirror: ObjectMirror,
}

impl MuxAssetMirror {
    pub fn new(mirror: ObjectMirror) -> Self {
        Self { mirror }
    }
}

#[async_trait]
impl AssetMirror for MuxAssetMirror {
    async fn mirror_playback_assets(&self, playback_id: &str) -> StorageResult<MirroredAssets> {
        // Both copies are staged together; if either fails the whole ready
        // update is abandoned and nothing is committed to the record.
        let thumbnail_source = thumbnail_source_url(playback_id);
        let thumbnail_dest = thumbnail_key(playback_id);
        let preview_source = preview_source_url(playback_id);
        let preview_dest = preview_key(playback_id);
        let (thumbnail, preview) = try_join!(
            self.mirror
                .store_from_url(&thumbnail_source, &thumbnail_dest),
            self.mirror
                .store_from_url(&preview_source, &preview_dest),
        )?;

        Ok(MirroredAssets { thumbnail, preview })
    }

    async fn delete_by_key(&self, key: &str) -> StorageResult<()> {
        self.mirror.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_urls() {
        assert_eq!(
            thumbnail_source_url("play_1"),
            "https://image.mux.com/play_1/thumbnail.jpg"
        );
        assert_eq!(
            preview_source_url("play_1"),
            "https://image.mux.com/play_1/animated.gif"
        );
    }

    #[test]
    fn test_keys_never_collide_for_one_playback() {
        // Thumbnail and preview come from different source URLs and must
        // land under different keys
        assert_ne!(thumbnail_key("play_1"), preview_key("play_1"));
    }

    #[test]
    fn test_keys_are_scoped_per_playback() {
        assert_ne!(thumbnail_key("play_1"), thumbnail_key("play_2"));
        assert_ne!(preview_key("play_1"), preview_key("play_2"));
    }
}
