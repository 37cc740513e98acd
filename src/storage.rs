// src/storage.rs
//! Durable documents: the listing snapshot (`data.json`) and the feed URL (`url.txt`).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tokio::fs;

use crate::listing::ListingRecord;

pub const SNAPSHOT_FILE: &str = "data.json";
pub const FEED_URL_FILE: &str = "url.txt";

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Last persisted snapshot; empty when nothing was stored yet.
    async fn load_listings(&self) -> Result<Vec<ListingRecord>>;
    /// Overwrite the snapshot. Either the new document lands whole or the old one stays.
    async fn save_listings(&self, records: &[ListingRecord]) -> Result<()>;
    async fn load_feed_url(&self) -> Result<Option<String>>;
    async fn save_feed_url(&self, url: &str) -> Result<()>;
}

/// Files under one data directory, replaced via write-temp-then-rename.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn write_atomic(&self, name: &str, content: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating data dir {}", self.dir.display()))?;
        let target = self.path(name);
        let tmp = self.path(&format!(".{name}.tmp"));
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replacing {}", target.display()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for FileStorage {
    async fn load_listings(&self) -> Result<Vec<ListingRecord>> {
        let path = self.path(SNAPSHOT_FILE);
        let data = match fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        match serde_json::from_str::<Vec<ListingRecord>>(&data) {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(target: "storage", error = %e, path = %path.display(), "snapshot unreadable, starting empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save_listings(&self, records: &[ListingRecord]) -> Result<()> {
        let body = serde_json::to_vec_pretty(records).context("serializing snapshot")?;
        self.write_atomic(SNAPSHOT_FILE, &body).await
    }

    async fn load_feed_url(&self) -> Result<Option<String>> {
        let path = self.path(FEED_URL_FILE);
        match fs::read_to_string(&path).await {
            Ok(s) => {
                let url = s.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn save_feed_url(&self, url: &str) -> Result<()> {
        self.write_atomic(FEED_URL_FILE, url.trim().as_bytes()).await
    }
}

// --- Test helper ---
#[derive(Default)]
pub struct MemoryStorage {
    pub listings: Mutex<Option<Vec<ListingRecord>>>,
    pub feed_url: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(records: Vec<ListingRecord>) -> Self {
        let s = Self::default();
        *s.listings.lock().unwrap_or_else(|e| e.into_inner()) = Some(records);
        s
    }

    /// Make every subsequent save fail, leaving stored documents as they are.
    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn stored_listings(&self) -> Option<Vec<ListingRecord>> {
        self.listings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("memory storage: writes disabled"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn load_listings(&self) -> Result<Vec<ListingRecord>> {
        Ok(self.stored_listings().unwrap_or_default())
    }

    async fn save_listings(&self, records: &[ListingRecord]) -> Result<()> {
        self.check_writable()?;
        *self.listings.lock().unwrap_or_else(|e| e.into_inner()) = Some(records.to_vec());
        Ok(())
    }

    async fn load_feed_url(&self) -> Result<Option<String>> {
        Ok(self.feed_url.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn save_feed_url(&self, url: &str) -> Result<()> {
        self.check_writable()?;
        *self.feed_url.lock().unwrap_or_else(|e| e.into_inner()) = Some(url.trim().to_string());
        Ok(())
    }
}
