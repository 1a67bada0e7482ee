//! Request handlers.

pub mod health;
pub mod videos;
pub mod webhooks;

pub use health::*;
pub use videos::*;
pub use webhooks::*;
