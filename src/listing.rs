//! # Listing model
//! One normalized real-estate offer plus the draft type the feed parser fills.
//!
//! Every field of [`ListingRecord`] is always populated: missing source values
//! are replaced with the defaults below, both when parsing the feed and when
//! reading an older snapshot back from storage.

use serde::{Deserialize, Serialize};

pub const DEFAULT_ID: &str = "N/A";
pub const DEFAULT_TEXT: &str = "Не указано";
pub const DEFAULT_ROOMS: &str = "0";
/// Status code of the external market; listings without a status belong to it.
pub const DEFAULT_STATUS: &str = "1";
pub const DEFAULT_PRICE: &str = "0";
pub const DEFAULT_AGENT: &str = "Нет агента";
pub const DEFAULT_AREA: &str = "0";
pub const ADDRESS_SEPARATOR: &str = ", ";

fn default_id() -> String {
    DEFAULT_ID.to_string()
}
fn default_text() -> String {
    DEFAULT_TEXT.to_string()
}
fn default_rooms() -> String {
    DEFAULT_ROOMS.to_string()
}
fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}
fn default_price() -> String {
    DEFAULT_PRICE.to_string()
}
fn default_agent() -> String {
    DEFAULT_AGENT.to_string()
}
fn default_area() -> String {
    DEFAULT_AREA.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(default = "default_id")]
    pub id: String,
    /// Rent vs. sale, free-form as published by the feed.
    #[serde(rename = "type", default = "default_text")]
    pub deal_type: String,
    #[serde(default = "default_text")]
    pub category: String,
    /// Opaque room-count token, compared by equality only.
    #[serde(default = "default_rooms")]
    pub rooms: String,
    /// Market origin code ("1" external, "2" internal).
    #[serde(default = "default_status")]
    pub status: String,
    /// Kept verbatim; only rendered with separators when it is all digits.
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default = "default_agent")]
    pub agent: String,
    #[serde(default = "default_text")]
    pub address: String,
    #[serde(default = "default_area")]
    pub area: String,
}

impl Default for ListingRecord {
    fn default() -> Self {
        ListingDraft::default().into_record()
    }
}

/// Values extracted from one offer before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingDraft {
    pub id: Option<String>,
    pub deal_type: Option<String>,
    pub category: Option<String>,
    pub rooms: Option<String>,
    pub status: Option<String>,
    pub price: Option<String>,
    pub agent: Option<String>,
    pub district: Option<String>,
    pub locality: Option<String>,
    pub sub_locality: Option<String>,
    pub street: Option<String>,
    pub area: Option<String>,
}

impl ListingDraft {
    /// Number of record fields that will fall back to a default.
    pub fn missing_fields(&self) -> usize {
        let address_missing = compose_address([
            self.district.as_deref(),
            self.locality.as_deref(),
            self.sub_locality.as_deref(),
            self.street.as_deref(),
        ])
        .is_none();
        [
            present(&self.id),
            present(&self.deal_type),
            present(&self.category),
            self.rooms.as_deref().and_then(normalize_rooms).is_some(),
            present(&self.status),
            present(&self.price),
            present(&self.agent),
            !address_missing,
            present(&self.area),
        ]
        .iter()
        .filter(|ok| !**ok)
        .count()
    }

    pub fn into_record(self) -> ListingRecord {
        let address = compose_address([
            self.district.as_deref(),
            self.locality.as_deref(),
            self.sub_locality.as_deref(),
            self.street.as_deref(),
        ])
        .unwrap_or_else(default_text);

        ListingRecord {
            id: or_default(self.id, DEFAULT_ID),
            deal_type: or_default(self.deal_type, DEFAULT_TEXT),
            category: or_default(self.category, DEFAULT_TEXT),
            rooms: self
                .rooms
                .as_deref()
                .and_then(normalize_rooms)
                .unwrap_or_else(default_rooms),
            status: or_default(self.status, DEFAULT_STATUS),
            price: or_default(self.price, DEFAULT_PRICE),
            agent: or_default(self.agent, DEFAULT_AGENT),
            address,
            area: or_default(self.area, DEFAULT_AREA),
        }
    }
}

fn present(v: &Option<String>) -> bool {
    v.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn or_default(v: Option<String>, default: &str) -> String {
    match v {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Join the non-empty location parts with `", "`; `None` when nothing is left.
pub fn compose_address<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let joined = parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(ADDRESS_SEPARATOR);
    (!joined.is_empty()).then_some(joined)
}

/// Keep a room count only when it is a plain non-negative integer.
pub fn normalize_rooms(raw: &str) -> Option<String> {
    let t = raw.trim();
    is_numeric_token(t).then(|| t.to_string())
}

pub fn is_numeric_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
