//! Application state.

use std::sync::Arc;

use anyhow::Context;

use vtube_firestore::{FirestoreClient, VideoRepository};
use vtube_queue::JobQueue;
use vtube_storage::{ObjectMirror, R2Client};
use vtube_webhook::{MuxAssetMirror, Reconciler, SignatureVerifier};

use crate::config::ApiConfig;

/// The reconciler wired to its production collaborators.
pub type AppReconciler = Reconciler<VideoRepository, MuxAssetMirror>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub firestore: Arc<FirestoreClient>,
    pub storage: Arc<R2Client>,
    pub queue: Arc<JobQueue>,
    pub videos: VideoRepository,
    pub verifier: SignatureVerifier,
    pub reconciler: AppReconciler,
}

impl AppState {
    /// Create new application state.
    ///
    /// Fails fast on any missing configuration — in particular the webhook
    /// secret: serving the webhook endpoint without signature verification
    /// is never acceptable, so the process refuses to start instead.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let secret = std::env::var("MUX_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .context("MUX_WEBHOOK_SECRET must be set; refusing to serve unverified webhooks")?;
        let verifier = SignatureVerifier::new(secret);

        let storage = R2Client::from_env()
            .await
            .context("Failed to initialize R2 client")?;
        let firestore = FirestoreClient::from_env()
            .await
            .context("Failed to initialize Firestore client")?;
        let queue = JobQueue::from_env().context("Failed to initialize job queue")?;

        let videos = VideoRepository::new(firestore.clone());
        let mirror = MuxAssetMirror::new(
            ObjectMirror::new(storage.clone()).context("Failed to initialize asset mirror")?,
        );
        let reconciler = Reconciler::new(videos.clone(), mirror);

        Ok(Self {
            config,
            firestore: Arc::new(firestore),
            storage: Arc::new(storage),
            queue: Arc::new(queue),
            videos,
            verifier,
            reconciler,
        })
    }
}
