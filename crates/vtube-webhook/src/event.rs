//! Webhook event classification.
//!
//! Maps a verified payload onto the closed [`WebhookEvent`] taxonomy.
//! Unknown event types classify as [`WebhookEvent::Unhandled`] — the
//! provider adds types over time and they must not bounce as errors.

use serde::Deserialize;
use serde_json::Value;

use vtube_models::{ProcessingStatus, TrackStatus};

use crate::error::{WebhookError, WebhookResult};

/// Raw webhook envelope: event type plus an untyped data object.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

/// A classified webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// The provider created an asset for an upload. First event for a
    /// record; correlates by upload id.
    AssetCreated {
        asset_id: String,
        status: ProcessingStatus,
        upload_id: String,
    },
    /// The asset finished transcoding and is playable.
    AssetReady {
        asset_id: String,
        status: ProcessingStatus,
        upload_id: String,
        playback_id: String,
        duration_seconds: Option<f64>,
    },
    /// Transcoding failed.
    AssetErrored {
        status: ProcessingStatus,
        upload_id: String,
    },
    /// The asset was deleted upstream.
    AssetDeleted { upload_id: String },
    /// A subtitle track became ready. Correlates by asset id.
    TrackReady {
        track_id: String,
        status: TrackStatus,
        asset_id: String,
    },
    /// Event type this system does not react to.
    Unhandled { event_type: String },
}

impl WebhookEvent {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::AssetCreated { .. } => "asset_created",
            WebhookEvent::AssetReady { .. } => "asset_ready",
            WebhookEvent::AssetErrored { .. } => "asset_errored",
            WebhookEvent::AssetDeleted { .. } => "asset_deleted",
            WebhookEvent::TrackReady { .. } => "track_ready",
            WebhookEvent::Unhandled { .. } => "unhandled",
        }
    }
}

/// Classify a verified payload.
pub fn classify(body: &[u8]) -> WebhookResult<WebhookEvent> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| WebhookError::malformed(format!("invalid JSON payload: {}", e)))?;

    let event_type = envelope.event_type.as_str();
    let data = &envelope.data;

    match event_type {
        "video.asset.created" => Ok(WebhookEvent::AssetCreated {
            asset_id: require_str(data, event_type, "id")?,
            status: require_status(data, event_type)?,
            upload_id: require_str(data, event_type, "upload_id")?,
        }),
        "video.asset.ready" => Ok(WebhookEvent::AssetReady {
            asset_id: require_str(data, event_type, "id")?,
            status: require_status(data, event_type)?,
            upload_id: require_str(data, event_type, "upload_id")?,
            playback_id: require_playback_id(data, event_type)?,
            duration_seconds: data.get("duration").and_then(Value::as_f64),
        }),
        "video.asset.errored" => Ok(WebhookEvent::AssetErrored {
            status: require_status(data, event_type)?,
            upload_id: require_str(data, event_type, "upload_id")?,
        }),
        "video.asset.deleted" => Ok(WebhookEvent::AssetDeleted {
            upload_id: require_str(data, event_type, "upload_id")?,
        }),
        "video.asset.track.ready" => Ok(WebhookEvent::TrackReady {
            track_id: require_str(data, event_type, "id")?,
            status: require_str(data, event_type, "status")?
                .parse::<TrackStatus>()
                .map_err(|e| WebhookError::malformed(format!("{} event: {}", event_type, e)))?,
            asset_id: require_str(data, event_type, "asset_id")?,
        }),
        _ => Ok(WebhookEvent::Unhandled {
            event_type: envelope.event_type,
        }),
    }
}

fn require_str(data: &Value, event_type: &str, field: &str) -> WebhookResult<String> {
    data.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            WebhookError::malformed(format!("{} event missing {}", event_type, field))
        })
}

fn require_status(data: &Value, event_type: &str) -> WebhookResult<ProcessingStatus> {
    require_str(data, event_type, "status")?
        .parse::<ProcessingStatus>()
        .map_err(|e| WebhookError::malformed(format!("{} event: {}", event_type, e)))
}

/// First entry of the `playback_ids` list; an empty or absent list is a
/// malformed event, not a missing record.
fn require_playback_id(data: &Value, event_type: &str) -> WebhookResult<String> {
    data.get("playback_ids")
        .and_then(Value::as_array)
        .and_then(|ids| ids.first())
        .and_then(|entry| entry.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            WebhookError::malformed(format!("{} event has no playback ids", event_type))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_asset_created() {
        let body = br#"{
            "type": "video.asset.created",
            "data": {"id": "asset_1", "status": "preparing", "upload_id": "up_1"}
        }"#;

        let event = classify(body).unwrap();
        assert_eq!(
            event,
            WebhookEvent::AssetCreated {
                asset_id: "asset_1".to_string(),
                status: ProcessingStatus::Preparing,
                upload_id: "up_1".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_asset_ready_with_duration() {
        let body = br#"{
            "type": "video.asset.ready",
            "data": {
                "id": "asset_1",
                "status": "ready",
                "upload_id": "up_1",
                "duration": 12.3456,
                "playback_ids": [{"id": "play_1", "policy": "public"}]
            }
        }"#;

        match classify(body).unwrap() {
            WebhookEvent::AssetReady {
                playback_id,
                duration_seconds,
                ..
            } => {
                assert_eq!(playback_id, "play_1");
                assert_eq!(duration_seconds, Some(12.3456));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_classify_asset_ready_without_duration() {
        let body = br#"{
            "type": "video.asset.ready",
            "data": {
                "id": "asset_1",
                "status": "ready",
                "upload_id": "up_1",
                "playback_ids": [{"id": "play_1"}]
            }
        }"#;

        match classify(body).unwrap() {
            WebhookEvent::AssetReady {
                duration_seconds, ..
            } => assert_eq!(duration_seconds, None),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_empty_playback_ids_is_malformed() {
        let body = br#"{
            "type": "video.asset.ready",
            "data": {"id": "asset_1", "status": "ready", "upload_id": "up_1", "playback_ids": []}
        }"#;

        let err = classify(body).unwrap_err();
        match err {
            WebhookError::MalformedEvent(msg) => assert!(msg.contains("playback ids")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_upload_id_names_the_field() {
        let body = br#"{
            "type": "video.asset.errored",
            "data": {"status": "errored"}
        }"#;

        match classify(body).unwrap_err() {
            WebhookError::MalformedEvent(msg) => {
                assert!(msg.contains("upload_id"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status_is_malformed() {
        let body = br#"{
            "type": "video.asset.created",
            "data": {"id": "asset_1", "status": "defrosting", "upload_id": "up_1"}
        }"#;

        assert!(matches!(
            classify(body).unwrap_err(),
            WebhookError::MalformedEvent(_)
        ));
    }

    #[test]
    fn test_track_ready_classifies() {
        let body = br#"{
            "type": "video.asset.track.ready",
            "data": {"id": "track_1", "status": "ready", "asset_id": "asset_1"}
        }"#;

        assert_eq!(
            classify(body).unwrap(),
            WebhookEvent::TrackReady {
                track_id: "track_1".to_string(),
                status: TrackStatus::Ready,
                asset_id: "asset_1".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_event_type_is_unhandled() {
        let body = br#"{"type": "video.live_stream.active", "data": {}}"#;

        assert_eq!(
            classify(body).unwrap(),
            WebhookEvent::Unhandled {
                event_type: "video.live_stream.active".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_json_is_malformed_not_a_panic() {
        assert!(matches!(
            classify(b"not json at all").unwrap_err(),
            WebhookError::MalformedEvent(_)
        ));
    }
}
