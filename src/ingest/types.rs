// src/ingest/types.rs
use reqwest::Url;

/// Batch-level refresh failures. Per-offer gaps are absorbed by the parser.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("invalid feed url `{0}`: scheme and host are required")]
    InvalidUrl(String),
    #[error("feed fetch failed: {0}")]
    Fetch(String),
    #[error("malformed feed: {0}")]
    MalformedFeed(String),
    #[error("snapshot could not be persisted: {0}")]
    Persist(String),
}

impl RefreshError {
    /// Short label for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            RefreshError::InvalidUrl(_) => "invalid_url",
            RefreshError::Fetch(_) => "fetch",
            RefreshError::MalformedFeed(_) => "malformed_feed",
            RefreshError::Persist(_) => "persist",
        }
    }
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Raw feed document at `url`, undecoded; the XML declaration names its encoding.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, RefreshError>;
    fn name(&self) -> &'static str;
}

/// Accept only absolute URLs that carry both a scheme and a host.
pub fn validate_feed_url(raw: &str) -> Result<Url, RefreshError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|_| RefreshError::InvalidUrl(trimmed.to_string()))?;
    if url.scheme().is_empty() || !url.host_str().is_some_and(|h| !h.is_empty()) {
        return Err(RefreshError::InvalidUrl(trimmed.to_string()));
    }
    Ok(url)
}
