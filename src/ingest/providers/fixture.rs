// src/ingest/providers/fixture.rs
use async_trait::async_trait;
use reqwest::Url;

use crate::ingest::types::{FeedSource, RefreshError};

/// Serves a fixed document regardless of the URL; stands in for the network in tests.
#[derive(Debug, Clone)]
pub enum FixtureFeedSource {
    Body(Vec<u8>),
    /// Simulates a transport failure.
    Unreachable(String),
}

impl FixtureFeedSource {
    pub fn from_fixture(xml: &str) -> Self {
        FixtureFeedSource::Body(xml.as_bytes().to_vec())
    }

    /// A document in an encoding other than UTF-8.
    pub fn from_bytes(body: impl Into<Vec<u8>>) -> Self {
        FixtureFeedSource::Body(body.into())
    }

    pub fn unreachable(reason: &str) -> Self {
        FixtureFeedSource::Unreachable(reason.to_string())
    }
}

#[async_trait]
impl FeedSource for FixtureFeedSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, RefreshError> {
        match self {
            FixtureFeedSource::Body(s) => Ok(s.clone()),
            FixtureFeedSource::Unreachable(reason) => {
                Err(RefreshError::Fetch(format!("GET {url}: {reason}")))
            }
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
