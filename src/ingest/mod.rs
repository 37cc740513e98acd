// src/ingest/mod.rs
pub mod providers;
pub mod realty_xml;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::catalog::{Catalog, CatalogSnapshot};
use crate::ingest::realty_xml::{parse_feed, ParsedFeed};
use crate::ingest::types::{validate_feed_url, FeedSource, RefreshError};
use crate::storage::Storage;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_refresh_total", "Catalog refresh attempts.");
        describe_counter!(
            "feed_refresh_errors_total",
            "Failed refreshes, labelled by error kind."
        );
        describe_counter!("feed_offers_parsed_total", "Offers read from the feed.");
        describe_counter!(
            "feed_fields_defaulted_total",
            "Listing fields missing in the feed and filled with a default."
        );
        describe_counter!("feed_fetch_bytes_total", "Bytes of feed documents downloaded.");
        describe_histogram!("feed_fetch_ms", "Feed download time in milliseconds.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "catalog_last_refresh_ts",
            "Unix ts of the last successful refresh."
        );
    });
}

/// Validate, download and parse a feed without touching any state.
pub async fn fetch_and_parse(
    source: &dyn FeedSource,
    url: &str,
    namespace: &str,
) -> Result<ParsedFeed, RefreshError> {
    let url = validate_feed_url(url)?;
    let body = source.fetch(&url).await?;

    let t0 = std::time::Instant::now();
    let parsed = parse_feed(&body, namespace)?;
    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("feed_offers_parsed_total").increment(parsed.records.len() as u64);
    counter!("feed_fields_defaulted_total").increment(parsed.defaulted_fields as u64);
    if parsed.defaulted_fields > 0 {
        tracing::debug!(
            target: "ingest",
            source = source.name(),
            defaulted = parsed.defaulted_fields,
            "offers with missing fields were defaulted"
        );
    }
    Ok(parsed)
}

/// Owns the refresh pipeline: fetch → parse → persist → swap.
pub struct Refresher {
    source: Arc<dyn FeedSource>,
    storage: Arc<dyn Storage>,
    catalog: Arc<Catalog>,
    namespace: String,
    lock: Mutex<()>,
}

impl Refresher {
    pub fn new(
        source: Arc<dyn FeedSource>,
        storage: Arc<dyn Storage>,
        catalog: Arc<Catalog>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            source,
            storage,
            catalog,
            namespace: namespace.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Replace the catalog with the feed at `url`.
    ///
    /// The snapshot is persisted before it is swapped in. On any error the
    /// stored document and the in-memory catalog are left exactly as they were.
    pub async fn refresh(&self, url: &str) -> Result<Arc<CatalogSnapshot>, RefreshError> {
        ensure_metrics_described();
        let _serial = self.lock.lock().await;
        counter!("feed_refresh_total").increment(1);

        match self.run(url).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                counter!("feed_refresh_errors_total", "kind" => e.kind()).increment(1);
                tracing::warn!(target: "ingest", error = %e, kind = e.kind(), url, "feed refresh failed");
                Err(e)
            }
        }
    }

    async fn run(&self, url: &str) -> Result<Arc<CatalogSnapshot>, RefreshError> {
        let parsed = fetch_and_parse(self.source.as_ref(), url, &self.namespace).await?;

        self.storage
            .save_listings(&parsed.records)
            .await
            .map_err(|e| RefreshError::Persist(format!("{e:#}")))?;

        let snapshot = self.catalog.replace(parsed.records);

        gauge!("catalog_listings").set(snapshot.len() as f64);
        gauge!("catalog_agents").set(snapshot.agents.len() as f64);
        if let Some(ts) = snapshot.refreshed_at {
            gauge!("catalog_last_refresh_ts").set(ts.timestamp() as f64);
        }
        tracing::info!(
            target: "ingest",
            listings = snapshot.len(),
            agents = snapshot.agents.len(),
            defaulted = parsed.defaulted_fields,
            source = self.source.name(),
            "catalog refreshed"
        );
        Ok(snapshot)
    }
}
