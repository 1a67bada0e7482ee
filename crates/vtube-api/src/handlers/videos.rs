//! Generation job trigger handlers.
//!
//! These endpoints submit AI generation jobs (thumbnail / title /
//! description) to the queue. The jobs run out-of-band in the worker; the
//! handlers only validate ownership and enqueue.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vtube_models::{VideoId, VideoRecord};
use vtube_queue::{GenerateDescriptionJob, GenerateThumbnailJob, GenerateTitleJob};

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_job_enqueued;
use crate::state::AppState;

/// Request body for generation triggers.
#[derive(Debug, Deserialize, Default)]
pub struct GenerateRequest {
    /// Generation prompt. Required for thumbnails, optional elsewhere.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Response for an accepted generation job.
#[derive(Serialize)]
pub struct EnqueuedResponse {
    pub job_id: String,
    pub video_id: String,
}

/// Submit a thumbnail generation job.
pub async fn generate_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<EnqueuedResponse>> {
    let user_id = require_user(&headers)?;
    let record = owned_video(&state, &video_id, &user_id).await?;

    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("prompt is required"))?;

    let job = GenerateThumbnailJob::new(record.id.clone(), user_id, prompt);
    let job_id = job.job_id.to_string();
    state.queue.enqueue_thumbnail(job).await?;

    record_job_enqueued("thumbnail");
    info!(video_id = %record.id, %job_id, "Enqueued thumbnail generation");

    Ok(Json(EnqueuedResponse {
        job_id,
        video_id: record.id.to_string(),
    }))
}

/// Submit a title generation job.
pub async fn generate_title(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<EnqueuedResponse>> {
    let user_id = require_user(&headers)?;
    let record = owned_video(&state, &video_id, &user_id).await?;

    let mut job = GenerateTitleJob::new(record.id.clone(), user_id);
    if let Some(prompt) = request.prompt.filter(|p| !p.trim().is_empty()) {
        job = job.with_prompt(prompt);
    }
    let job_id = job.job_id.to_string();
    state.queue.enqueue_title(job).await?;

    record_job_enqueued("title");
    info!(video_id = %record.id, %job_id, "Enqueued title generation");

    Ok(Json(EnqueuedResponse {
        job_id,
        video_id: record.id.to_string(),
    }))
}

/// Submit a description generation job.
pub async fn generate_description(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<EnqueuedResponse>> {
    let user_id = require_user(&headers)?;
    let record = owned_video(&state, &video_id, &user_id).await?;

    let mut job = GenerateDescriptionJob::new(record.id.clone(), user_id);
    if let Some(prompt) = request.prompt.filter(|p| !p.trim().is_empty()) {
        job = job.with_prompt(prompt);
    }
    let job_id = job.job_id.to_string();
    state.queue.enqueue_description(job).await?;

    record_job_enqueued("description");
    info!(video_id = %record.id, %job_id, "Enqueued description generation");

    Ok(Json(EnqueuedResponse {
        job_id,
        video_id: record.id.to_string(),
    }))
}

/// User identity established by the authenticating proxy in front of this
/// service; requests arriving without it were not authenticated.
fn require_user(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("Missing user identity"))
}

/// Load a video and verify ownership. Ownership misses read as not-found so
/// the endpoint does not leak which ids exist.
async fn owned_video(state: &AppState, video_id: &str, user_id: &str) -> ApiResult<VideoRecord> {
    let record = state
        .videos
        .get(&VideoId::from_string(video_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    if record.user_id != user_id {
        return Err(ApiError::not_found("Video not found"));
    }

    Ok(record)
}
