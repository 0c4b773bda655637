//! Watcher configuration.
//!
//! Values come from CLI flags with environment fallbacks (see `main.rs`);
//! this module holds the parsed form and the thread list parser.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::{WatchError, WatchResult};
use crate::store::{JsonFileStore, KvConfig, KvStore, MemoryStore, StateStore, DEFAULT_KV_API_BASE};

/// Environment variable holding the thread list.
pub const ENV_THREAD_URLS: &str = "THREAD_URLS";

/// Environment variable holding the webhook endpoint.
pub const ENV_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";

/// Default seconds between scheduled invocations.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Default budget for one per-thread unit.
pub const DEFAULT_UNIT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Settings read once at invocation start.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Threads to check.
    pub thread_urls: Vec<String>,
    /// Webhook endpoint for new-post announcements.
    pub webhook_url: Option<String>,
    /// Display name used for announcements.
    pub webhook_username: Option<String>,
    /// Budget for one unit (fetch through persist).
    pub unit_timeout: Duration,
    /// Timeout for each HTTP request.
    pub request_timeout: Duration,
    /// Send the content-maturity cookie for `/app/<id>/` URLs.
    pub mature_cookie: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            thread_urls: Vec::new(),
            webhook_url: None,
            webhook_username: None,
            unit_timeout: Duration::from_secs(DEFAULT_UNIT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            mature_cookie: true,
        }
    }
}

/// Where observations are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Process memory; lost on restart.
    Memory,
    /// JSON file on local disk.
    File,
    /// External key-value HTTP service.
    Kv,
}

/// Settings needed to open a state store.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub state_file: PathBuf,
    pub kv_api_base: Option<String>,
    pub kv_account_id: Option<String>,
    pub kv_namespace_id: Option<String>,
    pub kv_api_token: Option<String>,
}

impl StoreSettings {
    /// Open the configured backend.
    pub async fn open(&self, client: reqwest::Client) -> WatchResult<Arc<dyn StateStore>> {
        match self.backend {
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreBackend::File => Ok(Arc::new(JsonFileStore::open(&self.state_file).await?)),
            StoreBackend::Kv => {
                let config = KvConfig {
                    api_base: self
                        .kv_api_base
                        .clone()
                        .unwrap_or_else(|| DEFAULT_KV_API_BASE.to_string()),
                    account_id: required(self.kv_account_id.as_ref(), "KV_ACCOUNT_ID")?,
                    namespace_id: required(self.kv_namespace_id.as_ref(), "KV_NAMESPACE_ID")?,
                    api_token: required(self.kv_api_token.as_ref(), "KV_API_TOKEN")?,
                };
                Ok(Arc::new(KvStore::new(config, client)))
            }
        }
    }
}

fn required(value: Option<&String>, name: &str) -> WatchResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| WatchError::ConfigurationMissing(name.to_string()))
}

/// Parse the configured thread list.
///
/// Accepts a JSON array of strings, or a newline/comma separated list.
/// JSON is tried first. Entries are trimmed and empty ones dropped; non-string
/// JSON entries are ignored.
pub fn parse_thread_urls(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(values)) => {
            return values
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(_) => {
            tracing::debug!("Thread list is JSON but not an array, using delimiter parsing");
        }
        Err(e) if raw.trim_start().starts_with('[') => {
            tracing::warn!(error = %e, "Failed to parse thread URLs as JSON. Falling back to delimiter parsing.");
        }
        Err(_) => {}
    }

    raw.split(['\n', ','])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        assert_eq!(parse_thread_urls(Some(r#"["a","b"]"#)), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_delimited() {
        assert_eq!(parse_thread_urls(Some("a,b\nc")), vec!["a", "b", "c"]);
        assert_eq!(
            parse_thread_urls(Some(" https://x/1 ,\r\n\n https://x/2\n")),
            vec!["https://x/1", "https://x/2"]
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_thread_urls(Some("")).is_empty());
        assert!(parse_thread_urls(Some("  \n ")).is_empty());
        assert!(parse_thread_urls(None).is_empty());
        assert!(parse_thread_urls(Some("[]")).is_empty());
    }

    #[test]
    fn test_json_array_drops_non_strings_and_blanks() {
        assert_eq!(
            parse_thread_urls(Some(r#"[" a ", 1, null, "", "b"]"#)),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_malformed_json_falls_back() {
        assert_eq!(parse_thread_urls(Some(r#"["a","b""#)), vec![r#"["a""#, r#""b""#]);
    }

    #[tokio::test]
    async fn test_kv_backend_requires_credentials() {
        let settings = StoreSettings {
            backend: StoreBackend::Kv,
            state_file: PathBuf::from("unused.json"),
            kv_api_base: None,
            kv_account_id: Some("acct".to_string()),
            kv_namespace_id: None,
            kv_api_token: Some("token".to_string()),
        };
        let err = settings.open(reqwest::Client::new()).await.err().unwrap();
        assert!(matches!(err, WatchError::ConfigurationMissing(name) if name == "KV_NAMESPACE_ID"));
    }
}
