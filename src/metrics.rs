// src/metrics.rs
//! Prometheus exposition. Install before building the refresher and the bot:
//! series described while no recorder is installed lose their help text.

use anyhow::{Context, Result};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use shuttle_axum::axum::{routing::get, Router};

use crate::catalog::CatalogSnapshot;

/// Feed downloads of large agencies take seconds; parses take milliseconds.
const FEED_MS_BUCKETS: &[f64] = &[5.0, 25.0, 100.0, 250.0, 1_000.0, 2_500.0, 10_000.0, 30_000.0];

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the recorder and publish the state the process starts from:
    /// the restored catalog and no conversation in progress.
    pub fn init(restored: &CatalogSnapshot) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Prefix("feed_".into()), FEED_MS_BUCKETS)
            .context("prometheus: feed buckets")?
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_gauge!("catalog_listings", "Listings in the active catalog snapshot.");
        describe_gauge!("catalog_agents", "Distinct agents in the active catalog snapshot.");
        describe_gauge!("dialogue_active_sessions", "Conversations in the middle of a flow.");

        gauge!("catalog_listings").set(restored.len() as f64);
        gauge!("catalog_agents").set(restored.agents.len() as f64);
        gauge!("dialogue_active_sessions").set(0.0);

        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    }
}
