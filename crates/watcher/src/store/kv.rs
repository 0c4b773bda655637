//! Durable store backed by an external key-value HTTP service.
//!
//! Speaks the Cloudflare Workers KV REST shape:
//! `{base}/accounts/{account}/storage/kv/namespaces/{namespace}/values/{key}`.
//! No expiry, no versioning; the last write wins.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{thread_key, ObservationRecord, StateStore, StoreError, StoreResult};

/// Default API base URL.
pub const DEFAULT_KV_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the key-value service.
#[derive(Debug, Clone)]
pub struct KvConfig {
    pub api_base: String,
    pub account_id: String,
    pub namespace_id: String,
    pub api_token: String,
}

/// Key-value service observation store.
pub struct KvStore {
    config: KvConfig,
    client: reqwest::Client,
}

impl KvStore {
    #[must_use]
    pub fn new(config: KvConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// URL of the value slot for a storage key.
    fn value_url(&self, key: &str) -> String {
        format!(
            "{}/accounts/{}/storage/kv/namespaces/{}/values/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_id,
            self.config.namespace_id,
            urlencoding::encode(key)
        )
    }

    async fn status_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StoreError::Status { status, body }
    }
}

#[async_trait]
impl StateStore for KvStore {
    fn name(&self) -> &'static str {
        "kv"
    }

    async fn record(&self, url: &str) -> StoreResult<Option<ObservationRecord>> {
        let response = self
            .client
            .get(self.value_url(&thread_key(url)))
            .bearer_auth(&self.config.api_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            _ => Err(Self::status_error(response).await),
        }
    }

    async fn put(&self, record: &ObservationRecord) -> StoreResult<()> {
        let body = serde_json::to_string(record)?;
        let response = self
            .client
            .put(self.value_url(&record.key()))
            .bearer_auth(&self.config.api_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!(url = %record.url, count = record.count, "Stored observation in KV");
            Ok(())
        } else {
            Err(Self::status_error(response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const THREAD: &str = "https://example.com/t/1";
    const VALUE_PATH: &str =
        "/accounts/acct/storage/kv/namespaces/ns/values/thread%3Ahttps%253A%252F%252Fexample.com%252Ft%252F1";

    fn store(server: &MockServer) -> KvStore {
        KvStore::new(
            KvConfig {
                api_base: server.uri(),
                account_id: "acct".to_string(),
                namespace_id: "ns".to_string(),
                api_token: "secret".to_string(),
            },
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VALUE_PATH))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(store(&server).get(THREAD).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reads_stored_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VALUE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"url":"https://example.com/t/1","reviewCount":321,"fetchedAt":"2026-03-01T00:00:00Z"}"#,
            ))
            .mount(&server)
            .await;

        assert_eq!(store(&server).get(THREAD).await.unwrap(), Some(321));
    }

    #[tokio::test]
    async fn test_put_writes_record_json() {
        let server = MockServer::start().await;
        let record = ObservationRecord::now(THREAD, 99);
        Mock::given(method("PUT"))
            .and(path(VALUE_PATH))
            .and(body_json(serde_json::to_value(&record).unwrap()))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).put(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = store(&server).get(THREAD).await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 500, .. }));
    }
}
