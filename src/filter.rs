//! # Filter Engine
//! Pure evaluation of accumulated [`SelectionCriteria`] against catalog records.
//!
//! Criteria carry raw menu labels. They are compiled once per call into a
//! [`Predicate`]; every present constraint must hold (logical AND). A label
//! that cannot be mapped to a known value matches nothing, so an unexpected
//! button text never returns the unfiltered catalog.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::listing::{is_numeric_token, ListingRecord};

/// Status code carried by listings of the external market.
pub const STATUS_EXTERNAL: &str = "1";
/// Status code carried by listings of the agency's own (internal) market.
pub const STATUS_INTERNAL: &str = "2";

/// Choices accumulated over one dialogue. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub deal_type: Option<String>,
    pub agent: Option<String>,
    /// Raw category menu label, e.g. "🏠 2-комнатная" or "🏘️ Все".
    pub category: Option<String>,
    /// Raw market menu label, e.g. "🟣 Внутренняя".
    pub market: Option<String>,
}

impl SelectionCriteria {
    pub fn is_empty(&self) -> bool {
        self.deal_type.is_none()
            && self.agent.is_none()
            && self.category.is_none()
            && self.market.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Apartment,
    Lot,
    House,
    Garage,
    Room,
    Commercial,
}

impl PropertyKind {
    /// Category values a feed may use for this kind (lowercase).
    pub fn feed_values(self) -> &'static [&'static str] {
        match self {
            PropertyKind::Apartment => &["квартира", "apartment", "flat"],
            PropertyKind::Lot => &["участок", "lot"],
            PropertyKind::House => &["дом", "house"],
            PropertyKind::Garage => &["гараж", "garage"],
            PropertyKind::Room => &["комната", "room"],
            PropertyKind::Commercial => &["коммерческая", "commercial"],
        }
    }

    pub fn from_feed_value(category: &str) -> Option<Self> {
        let c = category.trim().to_lowercase();
        [
            PropertyKind::Apartment,
            PropertyKind::Lot,
            PropertyKind::House,
            PropertyKind::Garage,
            PropertyKind::Room,
            PropertyKind::Commercial,
        ]
        .into_iter()
        .find(|k| k.feed_values().contains(&c.as_str()))
    }

    fn matches(self, category: &str) -> bool {
        PropertyKind::from_feed_value(category) == Some(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    /// Apartments with exactly this many rooms (1..=4).
    Rooms(u8),
    Kind(PropertyKind),
    /// Label we do not know; matches nothing.
    Unknown,
}

static ROOM_BUCKET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([1-4])\s*-\s*(комнатная|комн\.?|room|rooms)$").expect("room bucket regex")
});

impl CategoryFilter {
    pub fn parse(label: &str) -> Self {
        let clean = strip_decoration(label).to_lowercase();
        if let Some(caps) = ROOM_BUCKET.captures(&clean) {
            return caps[1]
                .parse::<u8>()
                .map(CategoryFilter::Rooms)
                .unwrap_or(CategoryFilter::Unknown);
        }
        match clean.as_str() {
            "все" | "all" => CategoryFilter::All,
            "участок" | "lot" => CategoryFilter::Kind(PropertyKind::Lot),
            "дом" | "house" => CategoryFilter::Kind(PropertyKind::House),
            "гараж" | "garage" => CategoryFilter::Kind(PropertyKind::Garage),
            "комната" | "room" => CategoryFilter::Kind(PropertyKind::Room),
            "коммерческая" | "commercial" => CategoryFilter::Kind(PropertyKind::Commercial),
            _ => CategoryFilter::Unknown,
        }
    }

    pub fn matches(self, r: &ListingRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Rooms(n) => {
                PropertyKind::Apartment.matches(&r.category)
                    && is_numeric_token(&r.rooms)
                    && r.rooms == n.to_string()
            }
            CategoryFilter::Kind(kind) => kind.matches(&r.category),
            CategoryFilter::Unknown => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketFilter {
    Any,
    /// Required status code.
    Status(&'static str),
    Unknown,
}

impl MarketFilter {
    pub fn parse(label: &str) -> Self {
        match strip_decoration(label).to_lowercase().as_str() {
            "любая" | "любой" | "все" | "any" => MarketFilter::Any,
            "внутренняя" | "internal" => MarketFilter::Status(STATUS_INTERNAL),
            "внешняя" | "external" => MarketFilter::Status(STATUS_EXTERNAL),
            _ => MarketFilter::Unknown,
        }
    }

    pub fn matches(self, r: &ListingRecord) -> bool {
        match self {
            MarketFilter::Any => true,
            MarketFilter::Status(code) => r.status.trim() == code,
            MarketFilter::Unknown => false,
        }
    }
}

/// Criteria compiled for repeated evaluation.
#[derive(Debug, Clone)]
pub struct Predicate {
    deal_type: Option<String>,
    agent: Option<String>,
    category: Option<CategoryFilter>,
    market: Option<MarketFilter>,
}

impl Predicate {
    pub fn compile(c: &SelectionCriteria) -> Self {
        Self {
            deal_type: c.deal_type.as_deref().map(|d| d.trim().to_lowercase()),
            agent: c.agent.clone(),
            category: c.category.as_deref().map(CategoryFilter::parse),
            market: c.market.as_deref().map(MarketFilter::parse),
        }
    }

    pub fn matches(&self, r: &ListingRecord) -> bool {
        if let Some(d) = &self.deal_type {
            if r.deal_type.trim().to_lowercase() != *d {
                return false;
            }
        }
        if let Some(a) = &self.agent {
            if r.agent != *a {
                return false;
            }
        }
        if let Some(cat) = self.category {
            if !cat.matches(r) {
                return false;
            }
        }
        if let Some(m) = self.market {
            if !m.matches(r) {
                return false;
            }
        }
        true
    }
}

/// Matching records in catalog order. No limit; callers truncate for display.
pub fn apply(criteria: &SelectionCriteria, records: &[ListingRecord]) -> Vec<ListingRecord> {
    let p = Predicate::compile(criteria);
    records.iter().filter(|r| p.matches(r)).cloned().collect()
}

/// Drop a leading decorative token (emoji, bullet) from a menu label.
pub fn strip_decoration(label: &str) -> &str {
    let t = label.trim();
    match t.split_once(char::is_whitespace) {
        Some((head, rest)) if !head.chars().any(char::is_alphanumeric) => rest.trim(),
        _ if !t.chars().any(char::is_alphanumeric) => "",
        _ => t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ListingRecord> {
        vec![
            ListingRecord {
                id: "1".into(),
                category: "apartment".into(),
                rooms: "2".into(),
                deal_type: "rent".into(),
                status: "1".into(),
                agent: "Ivan".into(),
                ..Default::default()
            },
            ListingRecord {
                id: "2".into(),
                category: "house".into(),
                rooms: "0".into(),
                deal_type: "rent".into(),
                status: "2".into(),
                agent: "Olga".into(),
                ..Default::default()
            },
        ]
    }

    fn ids(v: &[ListingRecord]) -> Vec<&str> {
        v.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn strip_decoration_drops_emoji_token_only() {
        assert_eq!(strip_decoration("🏠 2-комнатная"), "2-комнатная");
        assert_eq!(strip_decoration("🟣 Внутренняя"), "Внутренняя");
        assert_eq!(strip_decoration("Иван Петров"), "Иван Петров");
        assert_eq!(strip_decoration("  internal "), "internal");
        assert_eq!(strip_decoration("🏘️"), "");
    }

    #[test]
    fn empty_criteria_is_identity() {
        let all = sample();
        assert_eq!(apply(&SelectionCriteria::default(), &all), all);
    }

    #[test]
    fn room_bucket_requires_apartment_and_exact_rooms() {
        let c = SelectionCriteria {
            category: Some("2-room".into()),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&c, &sample())), vec!["1"]);

        let c3 = SelectionCriteria {
            category: Some("🏠 3-комнатная".into()),
            ..Default::default()
        };
        assert!(apply(&c3, &sample()).is_empty());
    }

    #[test]
    fn non_numeric_rooms_never_match_a_bucket() {
        let mut rows = sample();
        rows[0].rooms = "2a".into();
        let c = SelectionCriteria {
            category: Some("2-room".into()),
            ..Default::default()
        };
        assert!(apply(&c, &rows).is_empty());
    }

    #[test]
    fn internal_market_matches_status_two() {
        let c = SelectionCriteria {
            market: Some("internal".into()),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&c, &sample())), vec!["2"]);

        let any = SelectionCriteria {
            market: Some("🌐 Любая".into()),
            ..Default::default()
        };
        assert_eq!(apply(&any, &sample()).len(), 2);
    }

    #[test]
    fn unknown_labels_fail_closed() {
        let cat = SelectionCriteria {
            category: Some("🚀 Космодром".into()),
            ..Default::default()
        };
        assert!(apply(&cat, &sample()).is_empty());

        let five = SelectionCriteria {
            category: Some("🏠 5-комнатная".into()),
            ..Default::default()
        };
        assert!(apply(&five, &sample()).is_empty());

        let market = SelectionCriteria {
            market: Some("🟡 Соседская".into()),
            ..Default::default()
        };
        assert!(apply(&market, &sample()).is_empty());
    }

    #[test]
    fn deal_type_is_case_insensitive_agent_is_not() {
        let c = SelectionCriteria {
            deal_type: Some("RENT".into()),
            ..Default::default()
        };
        assert_eq!(apply(&c, &sample()).len(), 2);

        let a = SelectionCriteria {
            agent: Some("ivan".into()),
            ..Default::default()
        };
        assert!(apply(&a, &sample()).is_empty());
    }

    #[test]
    fn cyrillic_deal_type_lowercases() {
        let rows = vec![ListingRecord {
            deal_type: "аренда".into(),
            ..Default::default()
        }];
        let c = SelectionCriteria {
            deal_type: Some("Аренда".into()),
            ..Default::default()
        };
        assert_eq!(apply(&c, &rows).len(), 1);
    }

    #[test]
    fn kind_labels_map_to_russian_feed_values() {
        let rows = vec![
            ListingRecord {
                id: "a".into(),
                category: "гараж".into(),
                ..Default::default()
            },
            ListingRecord {
                id: "b".into(),
                category: "Дом".into(),
                ..Default::default()
            },
        ];
        let garage = SelectionCriteria {
            category: Some("🚗 Гараж".into()),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&garage, &rows)), vec!["a"]);
        let house = SelectionCriteria {
            category: Some("🏡 Дом".into()),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&house, &rows)), vec!["b"]);
    }
}
