//! Asset mirroring: copy transient externally-hosted objects into R2.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vtube_models::AssetRef;

use crate::client::R2Client;
use crate::error::{StorageError, StorageResult};

/// Timeout for fetching a source object.
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Upper bound on a mirrored object (32 MiB). Thumbnails and animated
/// previews are far smaller; anything bigger is a misdirected URL.
const MAX_OBJECT_BYTES: usize = 32 * 1024 * 1024;

/// The two assets mirrored for a ready video.
///
/// Thumbnail and preview are named fields on purpose: the results come from
/// two distinct fetches and must never be collapsed into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirroredAssets {
    /// Still thumbnail
    pub thumbnail: AssetRef,
    /// Animated preview
    pub preview: AssetRef,
}

/// Mirrors external objects into owned R2 storage.
#[derive(Clone)]
pub struct ObjectMirror {
    r2: R2Client,
    http: reqwest::Client,
}

impl ObjectMirror {
    /// Create a new mirror over an R2 client.
    pub fn new(r2: R2Client) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("vtube-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StorageError::Http)?;

        Ok(Self { r2, http })
    }

    /// Fetch `source_url` and persist a durable copy under `key`.
    ///
    /// Returns the stable `(url, key)` pair for the stored object. Writing
    /// the same key twice overwrites in place, so mirroring with
    /// deterministic keys is safe to repeat.
    pub async fn store_from_url(&self, source_url: &str, key: &str) -> StorageResult<AssetRef> {
        debug!("Mirroring {} -> {}", source_url, key);

        let response = self.http.get(source_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::fetch_failed(format!(
                "{} returned {}",
                source_url, status
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for_key(key).to_string());

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_OBJECT_BYTES {
            return Err(StorageError::fetch_failed(format!(
                "{} exceeds {} byte limit",
                source_url, MAX_OBJECT_BYTES
            )));
        }

        self.r2.upload_bytes(bytes.to_vec(), key, &content_type).await?;

        info!("Mirrored {} to {}", source_url, key);
        Ok(AssetRef::new(self.r2.public_url(key), key))
    }

    /// Delete a previously mirrored object by key.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.r2.delete_object(key).await
    }
}

/// Content type derived from a key's extension, used when the source
/// response does not declare one.
fn content_type_for_key(key: &str) -> &'static str {
    if key.ends_with(".jpg") || key.ends_with(".jpeg") {
        "image/jpeg"
    } else if key.ends_with(".png") {
        "image/png"
    } else if key.ends_with(".gif") {
        "image/gif"
    } else if key.ends_with(".webp") {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::{R2Client, R2Config};

    use super::*;

    async fn test_mirror() -> ObjectMirror {
        let r2 = R2Client::new(R2Config {
            endpoint_url: "https://account.r2.cloudflarestorage.com".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "vtube".to_string(),
            region: "auto".to_string(),
            public_base_url: "https://media.vodtube.io".to_string(),
        })
        .await
        .unwrap();
        ObjectMirror::new(r2).unwrap()
    }

    #[tokio::test]
    async fn test_store_from_url_rejects_failed_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mirror = test_mirror().await;
        let err = mirror
            .store_from_url(
                &format!("{}/missing.jpg", server.uri()),
                "mux/p/thumbnail.jpg",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::FetchFailed(_)));
    }

    #[test]
    fn test_content_type_for_key() {
        assert_eq!(content_type_for_key("mux/p1/thumbnail.jpg"), "image/jpeg");
        assert_eq!(content_type_for_key("mux/p1/preview.gif"), "image/gif");
        assert_eq!(content_type_for_key("generated/abc.png"), "image/png");
        assert_eq!(content_type_for_key("weird/file.bin"), "application/octet-stream");
    }

    #[test]
    fn test_mirrored_assets_fields_stay_distinct() {
        let assets = MirroredAssets {
            thumbnail: AssetRef::new("https://cdn/t.jpg", "mux/p/thumbnail.jpg"),
            preview: AssetRef::new("https://cdn/p.gif", "mux/p/preview.gif"),
        };
        assert_ne!(assets.thumbnail.key, assets.preview.key);
        assert_ne!(assets.thumbnail.url, assets.preview.url);
    }
}
