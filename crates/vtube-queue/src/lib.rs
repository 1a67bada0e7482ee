//! Redis Streams job queue.
//!
//! This crate provides:
//! - Generation job types (thumbnail / title / description)
//! - Job enqueueing via Redis Streams with idempotency-key dedup
//!
//! Consumption, retries and dead-lettering are the worker's concern and
//! live with it.

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::{GenerateDescriptionJob, GenerateThumbnailJob, GenerateTitleJob, QueueJob};
pub use queue::{JobQueue, QueueConfig};
