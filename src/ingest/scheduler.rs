// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::config::ConfigState;
use crate::ingest::Refresher;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn a background task that refreshes the catalog from the current feed URL
/// every `interval_secs`. The first refresh happens one interval after start.
pub fn spawn_refresh_scheduler(
    cfg: RefreshSchedulerCfg,
    refresher: Arc<Refresher>,
    config: Arc<ConfigState>,
) -> JoinHandle<()> {
    let period = Duration::from_secs(cfg.interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            counter!("feed_scheduled_runs_total").increment(1);
            let url = config.feed_url();
            match refresher.refresh(&url).await {
                Ok(snapshot) => tracing::info!(
                    target: "ingest",
                    listings = snapshot.len(),
                    "scheduled refresh done"
                ),
                // cause already logged by the refresher
                Err(e) => tracing::debug!(target: "ingest", kind = e.kind(), "scheduled refresh failed"),
            }
        }
    })
}
