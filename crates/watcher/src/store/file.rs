//! Durable store backed by a single JSON document on disk.
//!
//! The document maps thread keys to records. It is loaded on open and
//! rewritten (temp file, then rename) after every put.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{thread_key, ObservationRecord, StateStore, StoreResult};

/// JSON file observation store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, ObservationRecord>>,
}

impl JsonFileStore {
    /// Open a store, reading existing records if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let records = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), records = records.len(), "Opened state file");

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }
}

async fn write_atomically(path: &Path, content: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl StateStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn record(&self, url: &str) -> StoreResult<Option<ObservationRecord>> {
        Ok(self.records.lock().await.get(&thread_key(url)).cloned())
    }

    async fn put(&self, record: &ObservationRecord) -> StoreResult<()> {
        // Held across the write so concurrent puts serialize on the file.
        // The map only changes once the file holds the new document.
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.insert(record.key(), record.clone());
        let content = serde_json::to_string_pretty(&next)?;
        write_atomically(&self.path, &content).await?;
        *records = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("threads.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.get("https://a").await.unwrap(), None);
        store.put(&ObservationRecord::now("https://a", 12)).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("https://a").await.unwrap(), Some(12));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("thread:https%3A%2F%2Fa"));
        assert!(raw.contains("\"reviewCount\": 12"));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_records_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threads.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.put(&ObservationRecord::now("https://a", 3)).await.unwrap();

        // A directory in the temp file's place makes the write fail.
        std::fs::create_dir(dir.path().join("threads.json.tmp")).unwrap();
        assert!(store.put(&ObservationRecord::now("https://a", 9)).await.is_err());
        assert!(store.put(&ObservationRecord::now("https://b", 1)).await.is_err());

        assert_eq!(store.get("https://a").await.unwrap(), Some(3));
        assert_eq!(store.get("https://b").await.unwrap(), None);
        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("https://a").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threads.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(JsonFileStore::open(&path).await.is_err());
    }
}
