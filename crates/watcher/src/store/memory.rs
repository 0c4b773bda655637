//! Process-lifetime store. State is lost on restart; the next run re-baselines.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{thread_key, ObservationRecord, StateStore, StoreResult};

/// In-memory observation store, owned by whoever constructs it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ObservationRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn record(&self, url: &str) -> StoreResult<Option<ObservationRecord>> {
        Ok(self.records.read().await.get(&thread_key(url)).cloned())
    }

    async fn put(&self, record: &ObservationRecord) -> StoreResult<()> {
        self.records
            .write()
            .await
            .insert(record.key(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new();
        assert_eq!(store.get("https://a").await.unwrap(), None);

        store.put(&ObservationRecord::now("https://a", 10)).await.unwrap();
        store.put(&ObservationRecord::now("https://a", 7)).await.unwrap();

        assert_eq!(store.get("https://a").await.unwrap(), Some(7));
        assert_eq!(store.get("https://b").await.unwrap(), None);
    }
}
