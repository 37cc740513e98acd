//! Realty feed bot: binary entrypoint.
//! Loads configuration and the stored catalog, starts the Telegram poller and
//! the optional refresh scheduler, then serves the HTTP surface.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use realty_feed_bot::api::{self, AppState};
use realty_feed_bot::bot::Bot;
use realty_feed_bot::catalog::{Catalog, CatalogSnapshot};
use realty_feed_bot::config::{BotConfig, ConfigState};
use realty_feed_bot::ingest::providers::HttpFeedSource;
use realty_feed_bot::ingest::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};
use realty_feed_bot::ingest::Refresher;
use realty_feed_bot::metrics::Metrics;
use realty_feed_bot::storage::{FileStorage, Storage};
use realty_feed_bot::transport::{telegram, TelegramTransport};

/// Compact logs by default; `BOT_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("realty_feed_bot=info,warn"));
    let json = std::env::var("BOT_LOG_JSON").ok().is_some_and(|v| v == "1");

    // the platform may have installed a subscriber already
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = BotConfig::load()?;

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&cfg.data_dir));
    let records = match storage.load_listings().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "storage", error = ?e, "stored snapshot unreadable, starting empty");
            Vec::new()
        }
    };
    tracing::info!(target: "storage", listings = records.len(), "catalog restored");
    let catalog = Arc::new(Catalog::new(CatalogSnapshot::new(records, None)));

    // recorder first, so the refresher and bot describe their series into it
    let metrics = match Metrics::init(&catalog.current()) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics endpoint disabled");
            None
        }
    };

    let config = Arc::new(ConfigState::bootstrap(&cfg, storage.as_ref()).await);
    let source = Arc::new(HttpFeedSource::new().with_timeout(cfg.fetch_timeout()));
    let refresher = Arc::new(Refresher::new(
        source,
        storage.clone(),
        catalog.clone(),
        cfg.feed_namespace.clone(),
    ));
    let bot = Arc::new(Bot::new(refresher.clone(), config.clone(), storage).configured(&cfg));

    if cfg.refresh_interval_secs > 0 {
        spawn_refresh_scheduler(
            RefreshSchedulerCfg {
                interval_secs: cfg.refresh_interval_secs,
            },
            refresher,
            config.clone(),
        );
    }

    match cfg.telegram_token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => {
            let transport = Arc::new(TelegramTransport::new(token));
            tokio::spawn(telegram::run_polling(bot.clone(), transport));
        }
        _ => tracing::warn!(target: "transport", "BOT_TOKEN not set, telegram polling disabled"),
    }

    let mut router = api::router(AppState { bot });
    if let Some(m) = &metrics {
        router = router.merge(m.router());
    }

    tracing::info!(feed_url = %config.feed_url(), admins = cfg.admins.len(), "bot started");
    Ok(router.into())
}
