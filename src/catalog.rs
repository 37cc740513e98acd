// src/catalog.rs
//! Process-wide listing catalog: one immutable snapshot behind a swappable `Arc`.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::listing::ListingRecord;

/// Records in feed order plus the agents derived from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogSnapshot {
    pub records: Vec<ListingRecord>,
    /// Distinct non-empty agent names, in order of first appearance.
    pub agents: Vec<String>,
    /// `None` for a snapshot restored from storage or never refreshed.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    pub fn new(records: Vec<ListingRecord>, refreshed_at: Option<DateTime<Utc>>) -> Self {
        let agents = distinct_agents(&records);
        Self {
            records,
            agents,
            refreshed_at,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn distinct_agents(records: &[ListingRecord]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in records {
        let name = r.agent.trim();
        if name.is_empty() || out.iter().any(|a| a == name) {
            continue;
        }
        out.push(name.to_string());
    }
    out
}

#[derive(Debug, Default)]
pub struct Catalog {
    inner: RwLock<Arc<CatalogSnapshot>>,
}

impl Catalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Live snapshot; stays valid even if a refresh swaps it out meanwhile.
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    pub fn agents(&self) -> Vec<String> {
        self.current().agents.clone()
    }

    /// Swap in a new snapshot; records and agents change together.
    pub fn replace(&self, records: Vec<ListingRecord>) -> Arc<CatalogSnapshot> {
        let fresh = Arc::new(CatalogSnapshot::new(records, Some(Utc::now())));
        self.install(Arc::clone(&fresh));
        fresh
    }

    pub(crate) fn install(&self, snapshot: Arc<CatalogSnapshot>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, agent: &str) -> ListingRecord {
        ListingRecord {
            id: id.into(),
            agent: agent.into(),
            ..Default::default()
        }
    }

    #[test]
    fn agents_keep_first_appearance_order() {
        let records = vec![
            rec("1", "Ольга"),
            rec("2", "Иван"),
            rec("3", "Ольга"),
            rec("4", ""),
            rec("5", "Пётр"),
        ];
        assert_eq!(distinct_agents(&records), vec!["Ольга", "Иван", "Пётр"]);
    }

    #[test]
    fn replace_swaps_records_and_agents_together() {
        let catalog = Catalog::new(CatalogSnapshot::new(vec![rec("1", "Иван")], None));
        let before = catalog.current();

        catalog.replace(vec![rec("7", "Ольга"), rec("8", "Ольга")]);

        let after = catalog.current();
        assert_eq!(after.len(), 2);
        assert_eq!(after.agents, vec!["Ольга"]);
        assert!(after.refreshed_at.is_some());
        // a reader holding the old snapshot still sees a consistent view
        assert_eq!(before.records[0].id, "1");
        assert_eq!(before.agents, vec!["Иван"]);
        assert_eq!(catalog.agents(), vec!["Ольга"]);
    }
}
