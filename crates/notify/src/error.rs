//! Error types for the notification system.

use thiserror::Error;

/// Placeholder recorded when a failed delivery's response body cannot be read.
pub const UNREADABLE_BODY: &str = "<failed to read response body>";

/// Errors that can occur when sending notifications.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Message violates the webhook precondition (no content and no embeds)
    #[error("Invalid webhook message: {0}")]
    InvalidMessage(String),

    /// Webhook answered with a non-success status
    #[error("Webhook delivery failed ({status}): {body}")]
    DeliveryFailed { status: u16, body: String },

    /// Channel is not configured
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
