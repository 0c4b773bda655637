//! Notification channel implementations.

pub mod discord;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::WebhookMessage;

/// Trait for notification channels (Discord, and anything speaking the same webhook body).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Deliver a message with a single attempt.
    async fn send(&self, message: &WebhookMessage) -> Result<(), ChannelError>;
}
