//! Discord webhook notification channel.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::NotifyChannel;
use crate::error::{ChannelError, UNREADABLE_BODY};
use crate::message::WebhookMessage;

/// Environment variable for Discord webhook URL.
pub const ENV_DISCORD_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";

/// Per-request timeout for webhook calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Discord webhook notification channel.
pub struct DiscordChannel {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordChannel {
    /// Create a Discord channel with a specific webhook URL.
    #[must_use]
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Reuse an existing HTTP client (connection pool) for webhook calls.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl NotifyChannel for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn enabled(&self) -> bool {
        !self.webhook_url.trim().is_empty()
    }

    async fn send(&self, message: &WebhookMessage) -> Result<(), ChannelError> {
        message.validate()?;

        if !self.enabled() {
            return Err(ChannelError::NotConfigured(ENV_DISCORD_WEBHOOK_URL.to_string()));
        }

        debug!(
            channel = "discord",
            embeds = message.embeds.len(),
            "Sending notification"
        );

        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(channel = "discord", "Notification sent successfully");
            return Ok(());
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| UNREADABLE_BODY.to_string());

        warn!(
            channel = "discord",
            status = %status,
            body = %body,
            retry_after = retry_after.as_deref(),
            "Discord webhook request failed"
        );

        Err(ChannelError::DeliveryFailed {
            status: status.as_u16(),
            body,
        })
    }
}
