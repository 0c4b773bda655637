//! thread-watch CLI - announce new posts in discussion threads to a chat webhook.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use thread_watch::config::{
    DEFAULT_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_UNIT_TIMEOUT_SECS, ENV_THREAD_URLS,
    ENV_WEBHOOK_URL,
};
use thread_watch::fetch::build_client;
use thread_watch::{
    parse_thread_urls, server, Broadcaster, CountExtractor, PageFetcher, Scheduler, StoreBackend,
    StoreSettings, WatcherConfig,
};

/// thread-watch - Poll discussion threads and announce new posts.
#[derive(Parser)]
#[command(name = "thread-watch")]
#[command(about = "Discussion thread watcher with chat webhook notifications")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single invocation (for cron use)
    Run {
        #[command(flatten)]
        watch: WatchArgs,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Run invocations on a fixed interval until interrupted
    Watch {
        #[command(flatten)]
        watch: WatchArgs,

        #[command(flatten)]
        store: StoreArgs,

        /// Seconds between invocations
        #[arg(long, env = "WATCH_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
        interval_secs: u64,

        /// Serve the readiness endpoint on this address
        #[arg(long, env = "LISTEN_ADDR")]
        listen: Option<SocketAddr>,
    },

    /// Fetch threads and print the extracted counts (no notify, no persist)
    Check {
        /// Thread URLs (defaults to THREAD_URLS)
        urls: Vec<String>,

        #[command(flatten)]
        watch: WatchArgs,
    },

    /// Forward every embedded comment of the given threads to the webhook
    Broadcast {
        /// Thread URLs (defaults to THREAD_URLS)
        urls: Vec<String>,

        #[command(flatten)]
        watch: WatchArgs,
    },
}

#[derive(Args, Clone)]
pub struct WatchArgs {
    /// Thread URLs as a JSON array or a comma/newline separated list
    #[arg(long = "threads", env = ENV_THREAD_URLS)]
    thread_urls: Option<String>,

    /// Chat webhook endpoint
    #[arg(long, env = ENV_WEBHOOK_URL, hide_env_values = true)]
    webhook_url: Option<String>,

    /// Display name for announcements
    #[arg(long, env = "WEBHOOK_USERNAME")]
    username: Option<String>,

    /// Budget in seconds for one thread (fetch through persist)
    #[arg(long, env = "UNIT_TIMEOUT_SECS", default_value_t = DEFAULT_UNIT_TIMEOUT_SECS)]
    unit_timeout_secs: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// Send the content-maturity cookie for /app/<id>/ thread URLs
    #[arg(long, env = "SEND_MATURE_COOKIE", default_value_t = true, action = ArgAction::Set)]
    mature_cookie: bool,
}

impl WatchArgs {
    fn to_config(&self) -> WatcherConfig {
        WatcherConfig {
            thread_urls: parse_thread_urls(self.thread_urls.as_deref()),
            webhook_url: self.webhook_url.clone(),
            webhook_username: self.username.clone(),
            unit_timeout: Duration::from_secs(self.unit_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            mature_cookie: self.mature_cookie,
        }
    }

    /// Positional URLs win over the configured list.
    fn urls_or_configured(&self, urls: Vec<String>) -> Vec<String> {
        if urls.is_empty() {
            parse_thread_urls(self.thread_urls.as_deref())
        } else {
            urls
        }
    }
}

#[derive(Args, Clone)]
pub struct StoreArgs {
    /// State backend
    #[arg(long, env = "STATE_BACKEND", value_enum, default_value = "memory")]
    backend: StoreBackend,

    /// State file for the file backend
    #[arg(long, env = "STATE_FILE", default_value = "thread-watch-state.json")]
    state_file: PathBuf,

    /// Key-value API base URL
    #[arg(long, env = "KV_API_BASE")]
    kv_api_base: Option<String>,

    /// Key-value account id
    #[arg(long, env = "KV_ACCOUNT_ID")]
    kv_account_id: Option<String>,

    /// Key-value namespace id
    #[arg(long, env = "KV_NAMESPACE_ID")]
    kv_namespace_id: Option<String>,

    /// Key-value API token
    #[arg(long, env = "KV_API_TOKEN", hide_env_values = true)]
    kv_api_token: Option<String>,
}

impl StoreArgs {
    fn to_settings(&self) -> StoreSettings {
        StoreSettings {
            backend: self.backend,
            state_file: self.state_file.clone(),
            kv_api_base: self.kv_api_base.clone(),
            kv_account_id: self.kv_account_id.clone(),
            kv_namespace_id: self.kv_namespace_id.clone(),
            kv_api_token: self.kv_api_token.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("thread_watch=debug,notify=debug,info")
        } else {
            EnvFilter::new("thread_watch=info,notify=info,warn")
        }
    });

    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    match cli.command {
        Commands::Run { watch, store } => {
            if store.backend == StoreBackend::Memory {
                tracing::warn!(
                    "Memory backend with a single run only records baselines; use --backend file or kv"
                );
            }
            let scheduler = build_scheduler(&watch, &store).await?;
            let summary = scheduler.invoke().await;
            print_cycle_summary(&summary);
            Ok(())
        }
        Commands::Watch {
            watch,
            store,
            interval_secs,
            listen,
        } => run_watch(&watch, &store, interval_secs, listen).await,
        Commands::Check { urls, watch } => run_check(watch.urls_or_configured(urls), &watch).await,
        Commands::Broadcast { urls, watch } => {
            run_broadcast(watch.urls_or_configured(urls), &watch).await
        }
    }
}

async fn build_scheduler(watch: &WatchArgs, store: &StoreArgs) -> Result<Scheduler> {
    let config = watch.to_config();
    let client = build_client(config.request_timeout).context("Failed to build HTTP client")?;
    let state = store
        .to_settings()
        .open(client.clone())
        .await
        .context("Failed to open state store")?;

    tracing::info!(
        threads = config.thread_urls.len(),
        store = state.name(),
        webhook = config.webhook_url.is_some(),
        "Loaded configuration"
    );

    Ok(Scheduler::new(config, state, client))
}

async fn run_watch(
    watch: &WatchArgs,
    store: &StoreArgs,
    interval_secs: u64,
    listen: Option<SocketAddr>,
) -> Result<()> {
    anyhow::ensure!(interval_secs > 0, "--interval-secs must be greater than zero");

    let scheduler = build_scheduler(watch, store).await?;

    let readiness = listen.map(|addr| {
        tokio::spawn(async move {
            if let Err(e) = server::serve(addr).await {
                tracing::error!(addr = %addr, error = %e, "Readiness endpoint stopped");
            }
        })
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    scheduler
        .run_every(Duration::from_secs(interval_secs), shutdown)
        .await;

    if let Some(handle) = readiness {
        handle.abort();
    }
    Ok(())
}

async fn run_check(urls: Vec<String>, watch: &WatchArgs) -> Result<()> {
    anyhow::ensure!(!urls.is_empty(), "No thread URLs given (pass URLs or set {ENV_THREAD_URLS})");

    let config = watch.to_config();
    let client = build_client(config.request_timeout).context("Failed to build HTTP client")?;
    let fetcher = PageFetcher::new(client, config.mature_cookie);
    let extractor = CountExtractor::default();

    for url in &urls {
        match fetcher.fetch(url).await {
            Ok(body) => match extractor.extract(&body) {
                Some(count) => println!("{count:>10}  {url}"),
                None => println!("{:>10}  {url}", "not found"),
            },
            Err(e) => eprintln!("{:>10}  {url}: {e}", "error"),
        }
    }

    Ok(())
}

async fn run_broadcast(urls: Vec<String>, watch: &WatchArgs) -> Result<()> {
    anyhow::ensure!(!urls.is_empty(), "No thread URLs given (pass URLs or set {ENV_THREAD_URLS})");

    let config = watch.to_config();
    let webhook_url = config
        .webhook_url
        .clone()
        .with_context(|| format!("{ENV_WEBHOOK_URL} is required for broadcast"))?;
    let client = build_client(config.request_timeout).context("Failed to build HTTP client")?;

    let notifier = Arc::new(notify::Notifier::for_webhook(webhook_url, client.clone()));
    let broadcaster = Broadcaster::new(PageFetcher::new(client, config.mature_cookie), notifier);

    for (url, result) in broadcaster.broadcast_all(&urls).await {
        match result {
            Ok(summary) => println!(
                "{url}: {} comments, {} sent, {} skipped, {} failed",
                summary.comments, summary.sent, summary.skipped, summary.failed
            ),
            Err(e) => eprintln!("{url}: {e}"),
        }
    }

    Ok(())
}

fn print_cycle_summary(summary: &thread_watch::CycleSummary) {
    if summary.skipped {
        println!("\nRun skipped (missing configuration)");
        return;
    }

    println!("\nWatch Cycle Summary");
    println!("   Threads: {}", summary.dispatched);
    println!("   Baselined: {}", summary.baselined);
    println!("   Notified: {}", summary.notified);
    println!("   Unchanged: {}", summary.unchanged);
    println!("   Decreased: {}", summary.decreased);

    if !summary.failures.is_empty() {
        println!("   Errors: {}", summary.failures.len());
        for (url, err) in &summary.failures {
            eprintln!("     - {url}: {err}");
        }
    }
}
