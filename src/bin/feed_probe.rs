//! Fetch and parse a feed once, print what the catalog would contain.
//!
//! `feed_probe [URL]` downloads the feed (default: configured URL);
//! `feed_probe --file PATH` parses a local document instead.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use realty_feed_bot::catalog::CatalogSnapshot;
use realty_feed_bot::config::BotConfig;
use realty_feed_bot::ingest::fetch_and_parse;
use realty_feed_bot::ingest::providers::HttpFeedSource;
use realty_feed_bot::ingest::realty_xml::parse_feed;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();
    let cfg = BotConfig::load()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (origin, parsed) = match args.as_slice() {
        [flag, path] if flag == "--file" => {
            let body = std::fs::read(path).with_context(|| format!("reading {path}"))?;
            (path.clone(), parse_feed(&body, &cfg.feed_namespace)?)
        }
        other => {
            let url = other.first().cloned().unwrap_or_else(|| cfg.feed_url.clone());
            let source = HttpFeedSource::new().with_timeout(cfg.fetch_timeout());
            let parsed = fetch_and_parse(&source, &url, &cfg.feed_namespace).await?;
            (url, parsed)
        }
    };

    let defaulted = parsed.defaulted_fields;
    let snapshot = CatalogSnapshot::new(parsed.records, None);

    let mut by_deal: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
    for r in &snapshot.records {
        *by_deal.entry(r.deal_type.as_str()).or_default() += 1;
        *by_category.entry(r.category.as_str()).or_default() += 1;
    }

    println!("feed:      {origin}");
    println!("listings:  {}", snapshot.len());
    println!("agents:    {}", snapshot.agents.join(", "));
    println!("defaulted: {defaulted} field(s)");
    for (deal, n) in by_deal {
        println!("  deal {deal:<16} {n}");
    }
    for (category, n) in by_category {
        println!("  category {category:<12} {n}");
    }
    Ok(())
}
