// src/ingest/providers/http.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, Url};

use crate::ingest::types::{FeedSource, RefreshError};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads the feed document over HTTP(S).
#[derive(Clone)]
pub struct HttpFeedSource {
    client: Client,
    timeout: Duration,
}

impl Default for HttpFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFeedSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, RefreshError> {
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RefreshError::Fetch(format!("GET {url}: {e}")))?;

        let resp = resp
            .error_for_status()
            .map_err(|e| RefreshError::Fetch(format!("GET {url}: {e}")))?;

        // the parser decodes; a header charset must not override the XML declaration
        let body = resp
            .bytes()
            .await
            .map_err(|e| RefreshError::Fetch(format!("reading body of {url}: {e}")))?;

        histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("feed_fetch_bytes_total").increment(body.len() as u64);
        Ok(body.to_vec())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
