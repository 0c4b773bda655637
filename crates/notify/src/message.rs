//! Webhook message types.
//!
//! The wire shape follows the Discord execute-webhook body:
//! `{ "content"?: string, "username"?: string, "embeds"?: [...] }`.

use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// A single chat message posted to a webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    /// Plain message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Display name override for the posting bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Structured attachments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl WebhookMessage {
    /// Create a text message.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Set the display name shown for this message.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the display name only when one is given.
    #[must_use]
    pub fn with_optional_username(mut self, username: Option<&str>) -> Self {
        if let Some(name) = username.filter(|n| !n.trim().is_empty()) {
            self.username = Some(name.to_string());
        }
        self
    }

    /// Attach an embed.
    #[must_use]
    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Check the webhook precondition: non-empty content or at least one embed.
    pub fn validate(&self) -> Result<(), ChannelError> {
        let has_content = self.content.as_deref().is_some_and(|c| !c.is_empty());
        if has_content || !self.embeds.is_empty() {
            Ok(())
        } else {
            Err(ChannelError::InvalidMessage(
                "webhook payload must include content or embeds".to_string(),
            ))
        }
    }
}

/// Rich attachment rendered below the message text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Embed {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_is_invalid() {
        assert!(WebhookMessage::default().validate().is_err());
        assert!(WebhookMessage::text("").validate().is_err());
    }

    #[test]
    fn test_embed_only_message_is_valid() {
        let msg = WebhookMessage::default().with_embed(Embed::new("New posts"));
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let json = serde_json::to_value(WebhookMessage::text("hello")).unwrap();
        assert_eq!(json, serde_json::json!({ "content": "hello" }));

        let json = serde_json::to_value(WebhookMessage::text("hi").with_username("alice")).unwrap();
        assert_eq!(json["username"], "alice");
        assert!(json.get("embeds").is_none());
    }

    #[test]
    fn test_blank_optional_username_ignored() {
        let msg = WebhookMessage::text("hi").with_optional_username(Some("  "));
        assert!(msg.username.is_none());
    }
}
