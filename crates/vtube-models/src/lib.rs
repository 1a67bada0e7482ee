//! Shared data models for VodTube backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and their provider-reported processing state
//! - Partial (field-level) record updates
//! - Mirrored asset references
//! - Generation job identifiers

pub mod job;
pub mod video;

// Re-export common types
pub use job::JobId;
pub use video::{
    AssetRef, ProcessingStatus, StatusParseError, TrackStatus, VideoId, VideoPatch, VideoRecord,
};
