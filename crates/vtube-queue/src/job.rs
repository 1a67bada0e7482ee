//! Job types for the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vtube_models::{JobId, VideoId};

/// Job to generate an AI thumbnail for a video.
///
/// The worker generates an image from the prompt, deletes the previously
/// mirrored thumbnail key (if any), stores the new object and patches both
/// halves of the thumbnail reference together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateThumbnailJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Target video record
    pub video_id: VideoId,
    /// User ID (owner)
    pub user_id: String,
    /// Image generation prompt
    pub prompt: String,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl GenerateThumbnailJob {
    pub fn new(
        video_id: VideoId,
        user_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            user_id: user_id.into(),
            prompt: prompt.into(),
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("thumbnail:{}:{}", self.user_id, self.video_id)
    }
}

/// Job to generate a title from the video transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateTitleJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Target video record
    pub video_id: VideoId,
    /// User ID (owner)
    pub user_id: String,
    /// Optional extra instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl GenerateTitleJob {
    pub fn new(video_id: VideoId, user_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            user_id: user_id.into(),
            prompt: None,
            created_at: Utc::now(),
        }
    }

    /// Set extra instructions.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("title:{}:{}", self.user_id, self.video_id)
    }
}

/// Job to generate a description from the video transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDescriptionJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Target video record
    pub video_id: VideoId,
    /// User ID (owner)
    pub user_id: String,
    /// Optional extra instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl GenerateDescriptionJob {
    pub fn new(video_id: VideoId, user_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            user_id: user_id.into(),
            prompt: None,
            created_at: Utc::now(),
        }
    }

    /// Set extra instructions.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("description:{}:{}", self.user_id, self.video_id)
    }
}

/// Any job carried on the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    GenerateThumbnail(GenerateThumbnailJob),
    GenerateTitle(GenerateTitleJob),
    GenerateDescription(GenerateDescriptionJob),
}

impl QueueJob {
    /// The job's unique ID.
    pub fn job_id(&self) -> &JobId {
        match self {
            QueueJob::GenerateThumbnail(j) => &j.job_id,
            QueueJob::GenerateTitle(j) => &j.job_id,
            QueueJob::GenerateDescription(j) => &j.job_id,
        }
    }

    /// The job's idempotency key.
    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::GenerateThumbnail(j) => j.idempotency_key(),
            QueueJob::GenerateTitle(j) => j.idempotency_key(),
            QueueJob::GenerateDescription(j) => j.idempotency_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_serde_round_trip() {
        let job = QueueJob::GenerateThumbnail(GenerateThumbnailJob::new(
            VideoId::from_string("vid_1"),
            "user_1",
            "a neon city at dusk",
        ));

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"type\":\"generate_thumbnail\""));

        let parsed: QueueJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.idempotency_key(), "thumbnail:user_1:vid_1");
    }

    #[test]
    fn test_idempotency_keys_distinguish_job_kinds() {
        let video = VideoId::from_string("vid_1");
        let thumb = GenerateThumbnailJob::new(video.clone(), "user_1", "p").idempotency_key();
        let title = GenerateTitleJob::new(video.clone(), "user_1").idempotency_key();
        let desc = GenerateDescriptionJob::new(video, "user_1").idempotency_key();

        assert_ne!(thumb, title);
        assert_ne!(title, desc);
    }
}
