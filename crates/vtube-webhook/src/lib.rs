//! Mux webhook ingestion core.
//!
//! Inbound lifecycle notifications flow one way through this crate:
//! signature verification ([`signature`]), classification into a closed
//! event taxonomy ([`event`]), then reconciliation against the video record
//! store ([`reconcile`]), mirroring provider-hosted assets on the way
//! ([`assets`]). Nothing here calls back upstream.

pub mod assets;
pub mod error;
pub mod event;
pub mod reconcile;
pub mod signature;
pub mod store;

pub use assets::MuxAssetMirror;
pub use error::{WebhookError, WebhookResult};
pub use event::{classify, WebhookEvent};
pub use reconcile::{AssetMirror, ReconcileOutcome, Reconciler, RecordStore};
pub use signature::{SignatureVerifier, SIGNATURE_HEADER};
