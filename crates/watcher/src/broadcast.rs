//! Raw comment broadcast.
//!
//! Reads the comment payload embedded in a thread page and posts every
//! comment as its own webhook message, using the comment author as the
//! display name. Nothing is stored, so each run re-sends the current page.

use std::sync::Arc;

use futures::future::join_all;
use notify::{Notifier, WebhookMessage};
use tracing::{error, info, warn};

use crate::error::WatchResult;
use crate::extract::payload::{extract_comment_payload, Comment};
use crate::fetch::PageFetcher;

/// Counts for one broadcast run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastSummary {
    /// Comments found on the page.
    pub comments: usize,
    pub sent: usize,
    /// Comments without text.
    pub skipped: usize,
    pub failed: usize,
}

/// Forwards embedded comments to the notifier.
pub struct Broadcaster {
    fetcher: PageFetcher,
    notifier: Arc<Notifier>,
}

impl Broadcaster {
    #[must_use]
    pub fn new(fetcher: PageFetcher, notifier: Arc<Notifier>) -> Self {
        Self { fetcher, notifier }
    }

    /// Broadcast each URL as an independent unit; failures are logged.
    pub async fn broadcast_all(&self, urls: &[String]) -> Vec<(String, WatchResult<BroadcastSummary>)> {
        let units = urls.iter().map(|url| async move {
            let result = self.broadcast(url).await;
            if let Err(e) = &result {
                error!(url = %url, error = %e, "Failed to broadcast thread comments");
            }
            (url.clone(), result)
        });
        join_all(units).await
    }

    /// Fetch one thread and send its comments concurrently.
    pub async fn broadcast(&self, url: &str) -> WatchResult<BroadcastSummary> {
        let html = self.fetcher.fetch(url).await?;
        let comments = extract_comment_payload(&html)?.comments();

        let mut summary = BroadcastSummary {
            comments: comments.len(),
            ..BroadcastSummary::default()
        };

        let sendable: Vec<&Comment> = comments
            .iter()
            .filter(|c| {
                let has_text = !c.text.trim().is_empty();
                if !has_text {
                    warn!(url, comment_id = %c.id, "Skipping comment without text");
                }
                has_text
            })
            .collect();
        summary.skipped = comments.len() - sendable.len();

        let sends = sendable.iter().map(|comment| async move {
            let message = comment_message(comment);
            (comment.id.as_str(), self.notifier.send(&message).await)
        });

        for (id, result) in join_all(sends).await {
            match result {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    error!(url, comment_id = id, error = %e, "Failed to forward comment");
                    summary.failed += 1;
                }
            }
        }

        info!(
            url,
            comments = summary.comments,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "Broadcast complete"
        );
        Ok(summary)
    }
}

/// Webhook message for one comment.
pub fn comment_message(comment: &Comment) -> WebhookMessage {
    WebhookMessage::text(comment.text.clone()).with_optional_username(Some(&comment.author))
}
