//! Job queue producer using Redis Streams.

use redis::AsyncCommands;
use tracing::{info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::{GenerateDescriptionJob, GenerateThumbnailJob, GenerateTitleJob, QueueJob};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Dedup key TTL in seconds
    pub dedup_ttl_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vtube:jobs".to_string(),
            dedup_ttl_secs: 3600,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM")
                .unwrap_or_else(|_| "vtube:jobs".to_string()),
            dedup_ttl_secs: std::env::var("QUEUE_DEDUP_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
        }
    }
}

/// Job queue producer.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Enqueue a thumbnail generation job.
    pub async fn enqueue_thumbnail(&self, job: GenerateThumbnailJob) -> QueueResult<String> {
        self.enqueue(QueueJob::GenerateThumbnail(job)).await
    }

    /// Enqueue a title generation job.
    pub async fn enqueue_title(&self, job: GenerateTitleJob) -> QueueResult<String> {
        self.enqueue(QueueJob::GenerateTitle(job)).await
    }

    /// Enqueue a description generation job.
    pub async fn enqueue_description(&self, job: GenerateDescriptionJob) -> QueueResult<String> {
        self.enqueue(QueueJob::GenerateDescription(job)).await
    }

    /// Enqueue a job.
    async fn enqueue(&self, job: QueueJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let idempotency_key = job.idempotency_key();

        // Reject duplicates still inside the dedup window
        let dedup_key = format!("vtube:dedup:{}", idempotency_key);
        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            warn!("Duplicate job rejected: {}", idempotency_key);
            return Err(QueueError::DuplicateJob(idempotency_key));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await?;

        conn.set_ex::<_, _, ()>(&dedup_key, "1", self.config.dedup_ttl_secs)
            .await?;

        info!(
            "Enqueued job {} with message ID {}",
            job.job_id(),
            message_id
        );

        Ok(message_id)
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.stream_name, "vtube:jobs");
        assert_eq!(config.dedup_ttl_secs, 3600);
    }
}
