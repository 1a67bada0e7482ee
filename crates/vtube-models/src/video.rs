//! Video record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a video record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Error returned when a provider status string is not recognized.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown status value: {0}")]
pub struct StatusParseError(pub String);

/// Provider-reported processing status of a video asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Asset is being transcoded
    #[default]
    Preparing,
    /// Asset is playable
    Ready,
    /// Transcoding failed
    Errored,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Preparing => "preparing",
            ProcessingStatus::Ready => "ready",
            ProcessingStatus::Errored => "errored",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preparing" => Ok(ProcessingStatus::Preparing),
            "ready" => Ok(ProcessingStatus::Ready),
            "errored" => Ok(ProcessingStatus::Errored),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider-reported status of a subtitle track.
///
/// Tracks have their own lifecycle, independent of the asset status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Preparing,
    Ready,
    Errored,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Preparing => "preparing",
            TrackStatus::Ready => "ready",
            TrackStatus::Errored => "errored",
        }
    }
}

impl FromStr for TrackStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preparing" => Ok(TrackStatus::Preparing),
            "ready" => Ok(TrackStatus::Ready),
            "errored" => Ok(TrackStatus::Errored),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to an object mirrored into owned storage.
///
/// `url` is the externally servable address; `key` is the storage handle
/// used for later deletion. The two always travel together so a record can
/// never hold a URL without the key needed to clean it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssetRef {
    /// Externally servable URL
    pub url: String,
    /// Object storage key
    pub key: String,
}

impl AssetRef {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
        }
    }
}

/// Video record stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique video ID
    pub id: VideoId,

    /// User ID (owner)
    pub user_id: String,

    /// Video title
    pub title: String,

    /// Video description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Upload correlation ID issued when the direct upload was created.
    /// Unique, set once, never reused.
    pub mux_upload_id: String,

    /// Provider asset ID, assigned once the asset is created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_asset_id: Option<String>,

    /// Provider playback ID, assigned when the asset becomes ready
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_playback_id: Option<String>,

    /// Provider-reported processing status
    #[serde(default)]
    pub mux_status: ProcessingStatus,

    /// Subtitle track ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_track_id: Option<String>,

    /// Subtitle track status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_track_status: Option<TrackStatus>,

    /// Mirrored still thumbnail URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Storage key of the mirrored thumbnail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,

    /// Mirrored animated preview URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    /// Storage key of the mirrored preview
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_key: Option<String>,

    /// Duration in milliseconds, 0 until the provider reports one
    #[serde(default)]
    pub duration_ms: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a new record as the upload-initiation flow does: only the
    /// upload correlation id is known, everything provider-side is unset.
    pub fn new(
        id: VideoId,
        user_id: impl Into<String>,
        title: impl Into<String>,
        mux_upload_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            user_id: user_id.into(),
            title: title.into(),
            description: None,
            mux_upload_id: mux_upload_id.into(),
            mux_asset_id: None,
            mux_playback_id: None,
            mux_status: ProcessingStatus::Preparing,
            mux_track_id: None,
            mux_track_status: None,
            thumbnail_url: None,
            thumbnail_key: None,
            preview_url: None,
            preview_key: None,
            duration_ms: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Thumbnail reference, if both halves are present.
    pub fn thumbnail(&self) -> Option<AssetRef> {
        match (&self.thumbnail_url, &self.thumbnail_key) {
            (Some(url), Some(key)) => Some(AssetRef::new(url, key)),
            _ => None,
        }
    }

    /// Preview reference, if both halves are present.
    pub fn preview(&self) -> Option<AssetRef> {
        match (&self.preview_url, &self.preview_key) {
            (Some(url), Some(key)) => Some(AssetRef::new(url, key)),
            _ => None,
        }
    }
}

/// Partial update to a video record.
///
/// Only fields that are `Some` are written; everything else is left
/// untouched by the store. Mirrored assets are carried as whole
/// [`AssetRef`] pairs so URL and key are committed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoPatch {
    pub mux_asset_id: Option<String>,
    pub mux_playback_id: Option<String>,
    pub mux_status: Option<ProcessingStatus>,
    pub mux_track_id: Option<String>,
    pub mux_track_status: Option<TrackStatus>,
    pub thumbnail: Option<AssetRef>,
    pub preview: Option<AssetRef>,
    pub duration_ms: Option<u64>,
}

impl VideoPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset_id(mut self, id: impl Into<String>) -> Self {
        self.mux_asset_id = Some(id.into());
        self
    }

    pub fn playback_id(mut self, id: impl Into<String>) -> Self {
        self.mux_playback_id = Some(id.into());
        self
    }

    pub fn status(mut self, status: ProcessingStatus) -> Self {
        self.mux_status = Some(status);
        self
    }

    pub fn track(mut self, id: impl Into<String>, status: TrackStatus) -> Self {
        self.mux_track_id = Some(id.into());
        self.mux_track_status = Some(status);
        self
    }

    pub fn thumbnail(mut self, asset: AssetRef) -> Self {
        self.thumbnail = Some(asset);
        self
    }

    pub fn preview(mut self, asset: AssetRef) -> Self {
        self.preview = Some(asset);
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// True if no field would be written.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply this patch to an in-memory record, bumping `updated_at`.
    ///
    /// The Firestore repository translates the patch into a field-masked
    /// merge instead; this is for callers (and tests) that hold the record.
    pub fn apply_to(&self, record: &mut VideoRecord) {
        if let Some(ref v) = self.mux_asset_id {
            record.mux_asset_id = Some(v.clone());
        }
        if let Some(ref v) = self.mux_playback_id {
            record.mux_playback_id = Some(v.clone());
        }
        if let Some(v) = self.mux_status {
            record.mux_status = v;
        }
        if let Some(ref v) = self.mux_track_id {
            record.mux_track_id = Some(v.clone());
        }
        if let Some(v) = self.mux_track_status {
            record.mux_track_status = Some(v);
        }
        if let Some(ref a) = self.thumbnail {
            record.thumbnail_url = Some(a.url.clone());
            record.thumbnail_key = Some(a.key.clone());
        }
        if let Some(ref a) = self.preview {
            record.preview_url = Some(a.url.clone());
            record.preview_key = Some(a.key.clone());
        }
        if let Some(v) = self.duration_ms {
            record.duration_ms = v;
        }
        record.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_generation() {
        let id1 = VideoId::new();
        let id2 = VideoId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ProcessingStatus::Preparing,
            ProcessingStatus::Ready,
            ProcessingStatus::Errored,
        ] {
            assert_eq!(status.as_str().parse::<ProcessingStatus>().unwrap(), status);
        }
        assert!("waiting".parse::<ProcessingStatus>().is_err());
    }

    #[test]
    fn test_new_record_starts_preparing() {
        let record = VideoRecord::new(VideoId::new(), "user_1", "Untitled", "up_abc");
        assert_eq!(record.mux_status, ProcessingStatus::Preparing);
        assert!(record.mux_asset_id.is_none());
        assert_eq!(record.duration_ms, 0);
        assert!(record.thumbnail().is_none());
    }

    #[test]
    fn test_patch_apply_preserves_unset_fields() {
        let mut record = VideoRecord::new(VideoId::new(), "user_1", "Untitled", "up_abc");
        record.mux_asset_id = Some("asset_1".to_string());

        VideoPatch::new()
            .status(ProcessingStatus::Errored)
            .apply_to(&mut record);

        assert_eq!(record.mux_status, ProcessingStatus::Errored);
        assert_eq!(record.mux_asset_id.as_deref(), Some("asset_1"));
        assert_eq!(record.mux_upload_id, "up_abc");
    }

    #[test]
    fn test_patch_commits_asset_pairs_atomically() {
        let mut record = VideoRecord::new(VideoId::new(), "user_1", "Untitled", "up_abc");

        VideoPatch::new()
            .thumbnail(AssetRef::new("https://cdn.example/t.jpg", "mux/p1/thumbnail.jpg"))
            .apply_to(&mut record);

        let thumb = record.thumbnail().expect("both halves set");
        assert_eq!(thumb.key, "mux/p1/thumbnail.jpg");
        assert!(record.preview().is_none());
    }

    #[test]
    fn test_empty_patch() {
        assert!(VideoPatch::new().is_empty());
        assert!(!VideoPatch::new().duration_ms(0).is_empty());
    }
}
