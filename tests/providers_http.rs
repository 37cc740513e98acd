// tests/providers_http.rs
//
// HttpFeedSource against a throwaway local server speaking minimal HTTP/1.1.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use realty_feed_bot::catalog::Catalog;
use realty_feed_bot::ingest::providers::HttpFeedSource;
use realty_feed_bot::ingest::realty_xml::YANDEX_REALTY_NS;
use realty_feed_bot::ingest::Refresher;
use realty_feed_bot::storage::MemoryStorage;
use realty_feed_bot::RefreshError;

const FEED: &str = include_str!("fixtures/realty_feed.xml");

/// Serve `status` + `body` to every connection; returns the base URL.
async fn serve(status: &'static str, body: &'static str, delay: Duration) -> String {
    serve_bytes(status, "application/xml; charset=utf-8", body.as_bytes().to_vec(), delay).await
}

async fn serve_bytes(
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
    delay: Duration,
) -> String {
    let body = Arc::new(body);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let head = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                    body.len()
                );
                let _ = sock.write_all(head.as_bytes()).await;
                let _ = sock.write_all(&body).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

fn refresher(source: HttpFeedSource) -> (Refresher, Arc<Catalog>) {
    let catalog = Arc::new(Catalog::default());
    let r = Refresher::new(
        Arc::new(source),
        Arc::new(MemoryStorage::new()),
        catalog.clone(),
        YANDEX_REALTY_NS,
    );
    (r, catalog)
}

#[tokio::test]
async fn downloads_and_parses_feed() {
    let base = serve("200 OK", FEED, Duration::ZERO).await;
    let (r, catalog) = refresher(HttpFeedSource::new());
    let snap = r.refresh(&format!("{base}/data/feed/yandex/agency.xml")).await.unwrap();
    assert_eq!(snap.len(), 5);
    assert_eq!(catalog.current().len(), 5);
}

#[tokio::test]
async fn windows_1251_feed_without_header_charset_is_decoded() {
    let xml = FEED.replacen(r#"encoding="UTF-8""#, r#"encoding="windows-1251""#, 1);
    assert_ne!(xml, FEED, "fixture declares its encoding");
    let (cp1251, _, unmappable) = encoding_rs::WINDOWS_1251.encode(&xml);
    assert!(!unmappable);

    let base = serve_bytes("200 OK", "text/xml", cp1251.into_owned(), Duration::ZERO).await;
    let (r, _) = refresher(HttpFeedSource::new());
    let snap = r.refresh(&format!("{base}/feed.xml")).await.unwrap();
    assert_eq!(snap.len(), 5);
    assert_eq!(snap.agents, vec!["Иван Петров", "Ольга Смирнова", "Нет агента"]);
    assert!(snap.records.iter().any(|l| l.deal_type == "аренда"));
}

#[tokio::test]
async fn non_success_status_is_a_fetch_error() {
    let base = serve("404 Not Found", "gone", Duration::ZERO).await;
    let (r, catalog) = refresher(HttpFeedSource::new());
    let err = r.refresh(&format!("{base}/feed.xml")).await.unwrap_err();
    assert!(matches!(err, RefreshError::Fetch(_)), "got {err:?}");
    assert!(catalog.current().is_empty());
}

#[tokio::test]
async fn slow_server_times_out() {
    let base = serve("200 OK", FEED, Duration::from_secs(5)).await;
    let (r, _) = refresher(HttpFeedSource::new().with_timeout(Duration::from_millis(200)));
    let err = r.refresh(&format!("{base}/feed.xml")).await.unwrap_err();
    assert_eq!(err.kind(), "fetch");
}

#[tokio::test]
async fn connection_refused_is_a_fetch_error() {
    // bind then drop to get a port nobody listens on
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    };
    let (r, _) = refresher(HttpFeedSource::new());
    let err = r.refresh(&format!("http://127.0.0.1:{port}/feed.xml")).await.unwrap_err();
    assert_eq!(err.kind(), "fetch");
}
