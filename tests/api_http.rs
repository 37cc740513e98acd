// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use realty_feed_bot::api::{self, AppState};
use realty_feed_bot::bot::Bot;
use realty_feed_bot::catalog::{Catalog, CatalogSnapshot};
use realty_feed_bot::config::ConfigState;
use realty_feed_bot::ingest::providers::FixtureFeedSource;
use realty_feed_bot::ingest::realty_xml::{parse_feed, YANDEX_REALTY_NS};
use realty_feed_bot::ingest::Refresher;
use realty_feed_bot::storage::MemoryStorage;
use realty_feed_bot::ui;

const BODY_LIMIT: usize = 1024 * 1024;
const FEED: &str = include_str!("fixtures/realty_feed.xml");

fn test_router() -> Router {
    let records = parse_feed(FEED.as_bytes(), YANDEX_REALTY_NS).expect("fixture").records;
    let storage = Arc::new(MemoryStorage::new());
    let refresher = Arc::new(Refresher::new(
        Arc::new(FixtureFeedSource::unreachable("offline")),
        storage.clone(),
        Arc::new(Catalog::new(CatalogSnapshot::new(records, None))),
        YANDEX_REALTY_NS,
    ));
    let config = Arc::new(ConfigState::new("https://feed.example/agency.xml", [1]));
    let bot = Bot::new(refresher, config, storage).with_reveal_pause(Duration::ZERO);
    api::router(AppState { bot: Arc::new(bot) })
}

async fn json_body(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn post_turn(app: &Router, chat_id: i64, user_id: i64, text: &str) -> Json {
    let payload = json!({ "chat_id": chat_id, "user_id": user_id, "text": text });
    let req = Request::builder()
        .method("POST")
        .uri("/turn")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /turn");
    let resp = app.clone().oneshot(req).await.expect("oneshot /turn");
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("read body");
    assert_eq!(String::from_utf8(bytes.to_vec()).expect("utf8"), "ok");
}

#[tokio::test]
async fn api_catalog_exposes_snapshot_and_feed_url() {
    let app = test_router();
    let req = Request::builder()
        .method("GET")
        .uri("/catalog")
        .body(Body::empty())
        .expect("build GET /catalog");
    let resp = app.oneshot(req).await.expect("oneshot /catalog");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = json_body(resp).await;
    assert_eq!(v["listings"].as_array().map(Vec::len), Some(5));
    assert_eq!(v["listings"][0]["type"], "аренда");
    assert_eq!(v["agents"][0], "Иван Петров");
    assert!(v["refreshed_at"].is_null());
    assert_eq!(v["feed_url"], "https://feed.example/agency.xml");
}

#[tokio::test]
async fn api_turns_walk_a_dialogue() {
    let app = test_router();

    let v = post_turn(&app, 9, 2, ui::BROWSE_BY_CATEGORY).await;
    assert_eq!(v["messages"][0]["text"], ui::ASK_DEAL_TYPE);
    assert_eq!(v["messages"][0]["keyboard"]["rows"][0][0], ui::DEAL_RENT);

    post_turn(&app, 9, 2, ui::DEAL_SALE).await;
    post_turn(&app, 9, 2, "🏘️ Все").await;
    let v = post_turn(&app, 9, 2, ui::MARKET_EXTERNAL).await;
    assert_eq!(v["messages"][0]["text"], "🔍 Найдено объектов: 2");

    let v = post_turn(&app, 9, 2, ui::REVEAL).await;
    let msgs = v["messages"].as_array().expect("messages");
    assert_eq!(msgs.len(), 3);
    assert!(msgs[0]["keyboard"].is_null());
    assert_eq!(msgs[2]["text"], ui::MENU);
}

#[tokio::test]
async fn api_refresh_failure_is_generic() {
    let app = test_router();
    let v = post_turn(&app, 9, 2, ui::REFRESH_DATA).await;
    assert_eq!(v["messages"][0]["text"], ui::REFRESH_FAILED);
}

#[tokio::test]
async fn api_turn_rejects_malformed_body() {
    let app = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/turn")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text": "hi"}"#))
        .expect("build POST /turn");
    let resp = app.oneshot(req).await.expect("oneshot /turn");
    assert!(resp.status().is_client_error());
}
