//! Change detection - one unit per thread: fetch, extract, compare, notify, persist.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use notify::{Notifier, WebhookMessage};
use tracing::{debug, error, info, warn};

use crate::config::{WatcherConfig, DEFAULT_UNIT_TIMEOUT_SECS};
use crate::error::{WatchError, WatchResult};
use crate::extract::CountExtractor;
use crate::fetch::PageFetcher;
use crate::store::{ObservationRecord, StateStore};

/// What one unit observed for its thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// First observation; stored without notifying.
    Baseline { count: u64 },
    /// Count grew; a notification was sent.
    Increased { previous: u64, current: u64 },
    /// Count did not change.
    Unchanged { count: u64 },
    /// Count shrank (deleted posts); stored, no notification.
    Decreased { previous: u64, current: u64 },
}

impl UnitOutcome {
    /// Compare a new count against the stored one.
    pub fn classify(previous: Option<u64>, current: u64) -> Self {
        match previous {
            None => Self::Baseline { count: current },
            Some(previous) if current > previous => Self::Increased { previous, current },
            Some(previous) if current < previous => Self::Decreased { previous, current },
            Some(_) => Self::Unchanged { count: current },
        }
    }
}

/// Result of one scheduled invocation.
#[derive(Debug, Default)]
pub struct CycleSummary {
    /// Units started.
    pub dispatched: usize,
    pub baselined: usize,
    pub notified: usize,
    pub unchanged: usize,
    pub decreased: usize,
    /// The invocation was skipped by a guard clause.
    pub skipped: bool,
    /// `(url, error)` for every failed unit.
    pub failures: Vec<(String, String)>,
}

impl CycleSummary {
    /// Summary for an invocation that dispatched nothing.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    fn record(&mut self, url: &str, result: WatchResult<UnitOutcome>) {
        match result {
            Ok(UnitOutcome::Baseline { .. }) => self.baselined += 1,
            Ok(UnitOutcome::Increased { .. }) => self.notified += 1,
            Ok(UnitOutcome::Unchanged { .. }) => self.unchanged += 1,
            Ok(UnitOutcome::Decreased { .. }) => self.decreased += 1,
            Err(e) => self.failures.push((url.to_string(), e.to_string())),
        }
    }
}

/// Thread watcher.
pub struct Watcher {
    fetcher: PageFetcher,
    extractor: CountExtractor,
    store: Arc<dyn StateStore>,
    notifier: Arc<Notifier>,
    username: Option<String>,
    unit_timeout: Duration,
}

impl Watcher {
    /// Create a watcher with the default extraction rules.
    #[must_use]
    pub fn new(fetcher: PageFetcher, store: Arc<dyn StateStore>, notifier: Arc<Notifier>) -> Self {
        Self {
            fetcher,
            extractor: CountExtractor::default(),
            store,
            notifier,
            username: None,
            unit_timeout: Duration::from_secs(DEFAULT_UNIT_TIMEOUT_SECS),
        }
    }

    /// Build a watcher from configuration. Fails if no webhook is configured.
    pub fn from_config(
        config: &WatcherConfig,
        store: Arc<dyn StateStore>,
        client: reqwest::Client,
    ) -> WatchResult<Self> {
        let webhook_url = config
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| WatchError::ConfigurationMissing(crate::config::ENV_WEBHOOK_URL.to_string()))?;

        let notifier = Arc::new(Notifier::for_webhook(webhook_url, client.clone()));
        let fetcher = PageFetcher::new(client, config.mature_cookie);

        Ok(Self::new(fetcher, store, notifier)
            .with_unit_timeout(config.unit_timeout)
            .with_username(config.webhook_username.clone()))
    }

    #[must_use]
    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Run one unit per distinct URL concurrently and wait for all of them.
    ///
    /// Unit failures are logged and collected; they never abort the batch.
    pub async fn run_cycle(&self, urls: &[String]) -> CycleSummary {
        let mut seen = HashSet::new();
        let targets: Vec<&str> = urls
            .iter()
            .map(String::as_str)
            .filter(|url| seen.insert(*url))
            .collect();

        let mut summary = CycleSummary {
            dispatched: targets.len(),
            ..CycleSummary::default()
        };

        info!(threads = targets.len(), store = self.store.name(), "Starting watch cycle");

        let units = targets
            .iter()
            .map(|url| async move { (*url, self.run_unit(url).await) });

        for (url, result) in join_all(units).await {
            if let Err(e) = &result {
                error!(url, error = %e, "Failed to process thread");
            }
            summary.record(url, result);
        }

        info!(
            dispatched = summary.dispatched,
            baselined = summary.baselined,
            notified = summary.notified,
            unchanged = summary.unchanged,
            decreased = summary.decreased,
            failed = summary.failures.len(),
            "Watch cycle complete"
        );

        summary
    }

    /// One unit bounded by the unit timeout.
    pub async fn run_unit(&self, url: &str) -> WatchResult<UnitOutcome> {
        match tokio::time::timeout(self.unit_timeout, self.check_thread(url)).await {
            Ok(result) => result,
            Err(_) => Err(WatchError::Timeout {
                url: url.to_string(),
                secs: self.unit_timeout.as_secs(),
            }),
        }
    }

    /// Fetch, extract, compare, notify if grown, then persist.
    ///
    /// The new count is stored even when the notification fails, so an
    /// increase is announced at most once.
    pub async fn check_thread(&self, url: &str) -> WatchResult<UnitOutcome> {
        let body = self.fetcher.fetch(url).await?;
        let count = self
            .extractor
            .extract(&body)
            .ok_or_else(|| WatchError::ExtractionFailed {
                url: url.to_string(),
            })?;

        let previous = self.store.get(url).await?;
        let outcome = UnitOutcome::classify(previous, count);

        let delivery = match outcome {
            UnitOutcome::Baseline { count } => {
                info!(url, count, "Stored initial post count");
                Ok(())
            }
            UnitOutcome::Increased { previous, current } => {
                let message = increase_message(url, previous, current, self.username.as_deref());
                let sent = self.notifier.send(&message).await;
                if sent.is_ok() {
                    info!(url, new_posts = current - previous, "Announced new posts");
                }
                sent.map_err(WatchError::from)
            }
            UnitOutcome::Unchanged { .. } => {
                debug!(url, count, "No new posts detected");
                Ok(())
            }
            UnitOutcome::Decreased { previous, current } => {
                warn!(url, previous, current, "Detected a decrease in post count");
                Ok(())
            }
        };

        self.store.put(&ObservationRecord::now(url, count)).await?;
        debug!(url, count, "Updated post count");

        delivery.map(|()| outcome)
    }
}

/// Announcement for a thread whose count grew.
pub fn increase_message(
    url: &str,
    previous: u64,
    current: u64,
    username: Option<&str>,
) -> WebhookMessage {
    let added = current.saturating_sub(previous);
    WebhookMessage::text(format!(
        "📢 New posts detected (+{} / {} total)\n{url}",
        format_count(added),
        format_count(current)
    ))
    .with_optional_username(username)
}

/// Format a count with `,` thousands grouping.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
