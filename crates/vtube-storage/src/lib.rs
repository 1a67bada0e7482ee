//! Cloudflare R2 storage client.
//!
//! This crate provides:
//! - Byte upload and object deletion against R2
//! - Public URL derivation for served objects
//! - Asset mirroring: fetch a transient external URL, persist a durable copy

pub mod client;
pub mod error;
pub mod mirror;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use mirror::{MirroredAssets, ObjectMirror};
