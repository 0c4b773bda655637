//! Thread page fetching.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, USER_AGENT};

use crate::error::{WatchError, WatchResult};

/// Client identifier sent with every request.
pub const CLIENT_USER_AGENT: &str = concat!(
    "thread-watch/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/5dlabs/thread-watch)"
);

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml";

/// Matches the store application id in a thread URL (`/app/<id>/`).
static APP_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/app/(\d+)(?:/|$)").unwrap());

/// Build the shared HTTP client.
pub fn build_client(request_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(request_timeout).build()
}

/// Application id embedded in a thread URL, if any.
pub fn app_id_from_url(url: &str) -> Option<&str> {
    APP_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Fetches thread pages as text.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    mature_cookie: bool,
}

impl PageFetcher {
    /// Create a fetcher. With `mature_cookie`, pages under `/app/<id>/` are
    /// requested with the content-maturity gate already accepted for that app.
    #[must_use]
    pub fn new(client: reqwest::Client, mature_cookie: bool) -> Self {
        Self {
            client,
            mature_cookie,
        }
    }

    fn headers_for(&self, url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));

        if self.mature_cookie {
            if let Some(app_id) = app_id_from_url(url) {
                // App ids are digits only, so the value is always a valid header.
                if let Ok(value) =
                    HeaderValue::from_str(&format!("wants_mature_content_apps={app_id};"))
                {
                    headers.insert(COOKIE, value);
                }
            }
        }
        headers
    }

    /// GET a page and return its body. Non-success status is an error.
    pub async fn fetch(&self, url: &str) -> WatchResult<String> {
        tracing::debug!(url, "Fetching thread page");

        let response = self
            .client
            .get(url)
            .headers(self.headers_for(url))
            .send()
            .await
            .map_err(|e| WatchError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| WatchError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(url, len = body.len(), "Got page content");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_app_id_from_url() {
        assert_eq!(
            app_id_from_url("https://steamcommunity.com/app/1806330/discussions/0/599658915298443000/"),
            Some("1806330")
        );
        assert_eq!(app_id_from_url("https://steamcommunity.com/app/42"), Some("42"));
        assert_eq!(app_id_from_url("https://example.com/apps/12/"), None);
    }

    #[tokio::test]
    async fn test_sends_client_headers_and_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/570/discussions/0/1/"))
            .and(header_exists("accept"))
            .and(header("user-agent", CLIENT_USER_AGENT))
            .and(header("cookie", "wants_mature_content_apps=570;"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(reqwest::Client::new(), true);
        let body = fetcher
            .fetch(&format!("{}/app/570/discussions/0/1/", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(reqwest::Client::new(), false);
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, WatchError::FetchStatus { status: 503, .. }));
    }
}
