//! Chat webhook notifications for thread-watch.
//!
//! This crate delivers [`WebhookMessage`]s to Discord-compatible webhooks.
//! Delivery is a single attempt; the caller decides what a failure means.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Notifier, WebhookMessage};
//!
//! # async fn run() -> Result<(), notify::ChannelError> {
//! let notifier = Notifier::for_webhook(
//!     "https://discord.com/api/webhooks/1/token",
//!     reqwest::Client::new(),
//! );
//! notifier
//!     .send(&WebhookMessage::text("New posts detected").with_username("thread-watch"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `NOTIFY_DISABLED`: Set to "true" to disable all notifications
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`DiscordChannel`] implements Discord webhook notifications
//! - [`Notifier`] validates a message once and hands it to every enabled channel

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod message;

pub use channels::discord::DiscordChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use message::{Embed, WebhookMessage};

use std::sync::Arc;
use tracing::{debug, error, info};

/// Environment variable to disable all notifications.
const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Central notification dispatcher.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier posting to one webhook URL.
    ///
    /// `NOTIFY_DISABLED` still wins over an explicit URL.
    #[must_use]
    pub fn for_webhook(webhook_url: impl Into<String>, client: reqwest::Client) -> Self {
        if disabled_by_env() {
            info!("Notifications disabled via NOTIFY_DISABLED");
            return Self::disabled();
        }
        let channel = DiscordChannel::new(webhook_url).with_client(client);
        Self::with_channels(vec![Arc::new(channel)])
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when notifications are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Send a message to every enabled channel and wait for delivery.
    ///
    /// The message precondition is checked before any network call. Every
    /// channel gets one attempt; the first failure is returned after all
    /// channels have been tried.
    pub async fn send(&self, message: &WebhookMessage) -> Result<(), ChannelError> {
        message.validate()?;

        if self.disabled {
            debug!("Notifications disabled, dropping message");
            return Ok(());
        }

        if self.channels.is_empty() {
            return Err(ChannelError::NotConfigured(
                "no notification channels".to_string(),
            ));
        }

        let mut first_error = None;
        for channel in &self.channels {
            let channel_name = channel.name();

            if !channel.enabled() {
                debug!(channel = channel_name, "Channel disabled, skipping");
                continue;
            }

            match channel.send(message).await {
                Ok(()) => debug!(channel = channel_name, "Notification sent"),
                Err(e) => {
                    error!(channel = channel_name, error = %e, "Failed to send notification");
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

fn disabled_by_env() -> bool {
    std::env::var(ENV_NOTIFY_DISABLED)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}
