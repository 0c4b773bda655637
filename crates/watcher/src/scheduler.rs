//! Scheduled invocation entry points.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::WatcherConfig;
use crate::store::StateStore;
use crate::watcher::{CycleSummary, Watcher};

/// Runs invocations against one configuration and one store.
///
/// The store outlives individual invocations, so an in-memory store keeps
/// its baselines for as long as the scheduler runs.
pub struct Scheduler {
    config: WatcherConfig,
    store: Arc<dyn StateStore>,
    client: reqwest::Client,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: WatcherConfig, store: Arc<dyn StateStore>, client: reqwest::Client) -> Self {
        Self {
            config,
            store,
            client,
        }
    }

    /// One invocation. Missing configuration skips the run with a warning.
    pub async fn invoke(&self) -> CycleSummary {
        if self.config.thread_urls.is_empty() {
            warn!("No thread URLs configured. Skipping scheduled run.");
            return CycleSummary::skipped();
        }

        let watcher = match Watcher::from_config(&self.config, Arc::clone(&self.store), self.client.clone()) {
            Ok(watcher) => watcher,
            Err(e) => {
                warn!(error = %e, "Skipping scheduled run");
                return CycleSummary::skipped();
            }
        };

        watcher.run_cycle(&self.config.thread_urls).await
    }

    /// Invoke on a fixed period until `shutdown` resolves.
    ///
    /// The first invocation runs immediately; ticks missed while an
    /// invocation is still running are skipped.
    pub async fn run_every(&self, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(period_secs = period.as_secs(), "Watch loop started");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping watch loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.invoke().await;
                }
            }
        }
    }
}
