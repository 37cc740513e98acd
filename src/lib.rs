// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod bot;
pub mod catalog;
pub mod config;
pub mod dialogue;
pub mod filter;
pub mod ingest;
pub mod listing;
pub mod metrics;
pub mod storage;
pub mod transport;
pub mod ui;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::bot::Bot;
pub use crate::catalog::{Catalog, CatalogSnapshot};
pub use crate::filter::{apply, SelectionCriteria};
pub use crate::ingest::types::RefreshError;
pub use crate::ingest::Refresher;
pub use crate::listing::ListingRecord;
