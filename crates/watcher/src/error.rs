//! Error types for the watcher.

use thiserror::Error;

use crate::extract::payload::PayloadError;
use crate::store::StoreError;

/// Errors raised while processing a thread or preparing an invocation.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Failed to fetch {url}: HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("Unable to locate a post count in page for {url}")]
    ExtractionFailed { url: String },

    #[error("Notification delivery failed: {0}")]
    Delivery(#[from] notify::ChannelError),

    #[error("Required configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Gave up on {url} after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("Comment payload error: {0}")]
    Payload(#[from] PayloadError),
}

/// Result alias for watcher operations.
pub type WatchResult<T> = Result<T, WatchError>;
