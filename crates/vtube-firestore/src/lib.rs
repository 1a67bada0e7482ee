//! Firestore REST API client.
//!
//! This crate provides:
//! - A typed repository for video records
//! - Secondary-key lookup via structured queries (upload id / asset id)
//! - Field-masked merge updates with existence preconditions
//! - Service account authentication via gcp_auth
//! - Token caching and retry logic

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod video_repo;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use types::{Document, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};
pub use video_repo::VideoRepository;
