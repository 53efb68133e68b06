//! Resource fetching.
//!
//! [`ResourceFetcher`] is the only I/O seam in the core: GET a URL, get back a parsed JSON
//! document or a failure. There is no retry logic at this layer or above it.

use crate::constants::FHIR_JSON_MEDIA_TYPE;
use crate::{SyncError, SyncResult};
use async_trait::async_trait;
use fhir::Page;
use serde_json::Value;
use std::time::Duration;

/// GET-by-URL returning a parsed JSON document.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> SyncResult<Value>;

    /// Fetch `url` and decode it as a search result page.
    async fn fetch_page(&self, url: &str) -> SyncResult<Page> {
        let document = self.fetch(url).await?;
        Ok(Page::from_json(&document)?)
    }
}

/// HTTP fetcher backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> SyncResult<Value> {
        tracing::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, FHIR_JSON_MEDIA_TYPE)
            .send()
            .await
            .map_err(|source| SyncError::Transport {
                url: url.to_string(),
                source,
            })?;

        check_status(url, response.status())?;

        response.json::<Value>().await.map_err(|source| SyncError::Json {
            url: url.to_string(),
            source,
        })
    }
}

/// Map a non-2xx response status to [`SyncError::Status`].
fn check_status(url: &str, status: reqwest::StatusCode) -> SyncResult<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(SyncError::Status {
        url: url.to_string(),
        status: status.as_u16(),
    })
}
