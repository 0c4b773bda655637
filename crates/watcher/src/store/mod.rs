//! Observation state storage.
//!
//! A [`StateStore`] maps a thread URL to its last [`ObservationRecord`].
//! Writes always overwrite; there is never more than one record per thread.

mod file;
mod kv;
mod memory;

pub use file::JsonFileStore;
pub use kv::{KvConfig, KvStore, DEFAULT_KV_API_BASE};
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace prefix for thread keys.
pub const KEY_PREFIX: &str = "thread:";

/// Errors from state backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Key-value service returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Last observed state of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub url: String,
    #[serde(rename = "reviewCount")]
    pub count: u64,
    #[serde(rename = "fetchedAt")]
    pub observed_at: DateTime<Utc>,
}

impl ObservationRecord {
    /// Record a count observed now.
    #[must_use]
    pub fn now(url: impl Into<String>, count: u64) -> Self {
        Self {
            url: url.into(),
            count,
            observed_at: Utc::now(),
        }
    }

    /// Storage key for this record.
    pub fn key(&self) -> String {
        thread_key(&self.url)
    }
}

/// Storage key for a thread URL: `thread:` plus the percent-encoded URL.
pub fn thread_key(url: &str) -> String {
    format!("{KEY_PREFIX}{}", urlencoding::encode(url))
}

/// Storage backend for observations.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Full record for a thread, if one was stored.
    async fn record(&self, url: &str) -> StoreResult<Option<ObservationRecord>>;

    /// Last stored count for a thread.
    async fn get(&self, url: &str) -> StoreResult<Option<u64>> {
        Ok(self.record(url).await?.map(|r| r.count))
    }

    /// Overwrite the record for `record.url`.
    async fn put(&self, record: &ObservationRecord) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_key_encodes_url() {
        assert_eq!(
            thread_key("https://example.com/app/1/discussions/0/2/"),
            "thread:https%3A%2F%2Fexample.com%2Fapp%2F1%2Fdiscussions%2F0%2F2%2F"
        );
    }

    #[test]
    fn test_record_wire_format() {
        let record = ObservationRecord {
            url: "https://example.com/t".to_string(),
            count: 42,
            observed_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://example.com/t",
                "reviewCount": 42,
                "fetchedAt": "2026-01-02T03:04:05Z"
            })
        );

        let back: ObservationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
