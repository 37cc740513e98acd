// src/config/bot.rs
//! Bot configuration: optional TOML/JSON file plus environment overrides.
//!
//! Resolution order for the file:
//! 1) `$BOT_CONFIG_PATH` (must exist)
//! 2) `config/bot.toml`
//! 3) `config/bot.json`
//! 4) built-in defaults
//!
//! Environment variables then override single keys, so a plain `.env` is
//! enough to run the bot.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ingest::realty_xml::YANDEX_REALTY_NS;
use crate::storage::Storage;

pub const ENV_CONFIG_PATH: &str = "BOT_CONFIG_PATH";
pub const ENV_TOKEN: &str = "BOT_TOKEN";
pub const ENV_FEED_URL: &str = "FEED_URL";
pub const ENV_FEED_NAMESPACE: &str = "FEED_NAMESPACE";
pub const ENV_ADMINS: &str = "BOT_ADMINS";
pub const ENV_DATA_DIR: &str = "BOT_DATA_DIR";
pub const ENV_REVEAL_PAUSE_MS: &str = "REVEAL_PAUSE_MS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FEED_TIMEOUT_SECS";
pub const ENV_REFRESH_INTERVAL_SECS: &str = "FEED_REFRESH_INTERVAL_SECS";
pub const ENV_LISTING_URL_BASE: &str = "LISTING_URL_BASE";

pub const DEFAULT_FEED_URL: &str = "https://www.nmls.ru/data/feed/yandex/agency1003479.xml";
pub const DEFAULT_LISTING_URL_BASE: &str = "http://nn.nmls.ru/realty/view/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Telegram Bot API token; polling is disabled without it.
    pub telegram_token: Option<String>,
    /// Feed URL used until an admin stores another one.
    pub feed_url: String,
    pub feed_namespace: String,
    pub admins: Vec<i64>,
    pub data_dir: PathBuf,
    /// Pause between listing cards when revealing results.
    pub reveal_pause_ms: u64,
    pub fetch_timeout_secs: u64,
    /// 0 disables the background refresh.
    pub refresh_interval_secs: u64,
    pub listing_url_base: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            feed_url: DEFAULT_FEED_URL.to_string(),
            feed_namespace: YANDEX_REALTY_NS.to_string(),
            admins: Vec::new(),
            data_dir: PathBuf::from("data"),
            reveal_pause_ms: 500,
            fetch_timeout_secs: 30,
            refresh_interval_secs: 0,
            listing_url_base: DEFAULT_LISTING_URL_BASE.to_string(),
        }
    }
}

impl BotConfig {
    /// Load from an explicit file. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading bot config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if ext == "json" {
            return serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()));
        }
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// File (see module docs) + environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn load_file_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        for candidate in ["config/bot.toml", "config/bot.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Ok(Self::default())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_value(ENV_TOKEN) {
            self.telegram_token = Some(v);
        }
        if let Some(v) = env_value(ENV_FEED_URL) {
            self.feed_url = v;
        }
        if let Some(v) = env_value(ENV_FEED_NAMESPACE) {
            self.feed_namespace = v;
        }
        if let Some(v) = env_value(ENV_ADMINS) {
            self.admins = parse_admins(&v)?;
        }
        if let Some(v) = env_value(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_value(ENV_REVEAL_PAUSE_MS) {
            self.reveal_pause_ms = parse_num(ENV_REVEAL_PAUSE_MS, &v)?;
        }
        if let Some(v) = env_value(ENV_FETCH_TIMEOUT_SECS) {
            self.fetch_timeout_secs = parse_num(ENV_FETCH_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = env_value(ENV_REFRESH_INTERVAL_SECS) {
            self.refresh_interval_secs = parse_num(ENV_REFRESH_INTERVAL_SECS, &v)?;
        }
        if let Some(v) = env_value(ENV_LISTING_URL_BASE) {
            self.listing_url_base = v;
        }
        Ok(())
    }

    pub fn reveal_pause(&self) -> Duration {
        Duration::from_millis(self.reveal_pause_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_num(name: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .with_context(|| format!("{name} must be a non-negative integer, got `{raw}`"))
}

/// Comma/whitespace separated user ids, e.g. `"784810066, 1234"`.
pub fn parse_admins(raw: &str) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let p = part.trim();
        if p.is_empty() {
            continue;
        }
        let id = p
            .parse::<i64>()
            .with_context(|| format!("{ENV_ADMINS}: `{p}` is not a user id"))?;
        if !out.contains(&id) {
            out.push(id);
        }
    }
    Ok(out)
}

/// Live, admin-mutable settings shared by every conversation.
#[derive(Debug)]
pub struct ConfigState {
    feed_url: RwLock<String>,
    admins: HashSet<i64>,
}

impl ConfigState {
    pub fn new(feed_url: impl Into<String>, admins: impl IntoIterator<Item = i64>) -> Self {
        Self {
            feed_url: RwLock::new(feed_url.into()),
            admins: admins.into_iter().collect(),
        }
    }

    /// A feed URL stored by an admin wins over the configured default.
    pub async fn bootstrap(cfg: &BotConfig, storage: &dyn Storage) -> Self {
        let url = match storage.load_feed_url().await {
            Ok(Some(stored)) => stored,
            Ok(None) => cfg.feed_url.clone(),
            Err(e) => {
                tracing::warn!(target: "storage", error = %e, "stored feed url unreadable, using configured one");
                cfg.feed_url.clone()
            }
        };
        Self::new(url, cfg.admins.iter().copied())
    }

    pub fn feed_url(&self) -> String {
        self.feed_url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }

    /// Persist first, then switch; a failed write keeps the old URL.
    pub async fn set_feed_url(&self, url: &str, storage: &dyn Storage) -> Result<()> {
        let url = url.trim();
        storage.save_feed_url(url).await.context("saving feed url")?;
        *self.feed_url.write().unwrap_or_else(|e| e.into_inner()) = url.to_string();
        tracing::info!(target: "storage", url, "feed url changed");
        Ok(())
    }
}
