// tests/dialogue_flow.rs
//
// End-to-end conversations through the bot dispatcher with a recording transport.

use std::sync::Arc;
use std::time::Duration;

use realty_feed_bot::bot::Bot;
use realty_feed_bot::catalog::Catalog;
use realty_feed_bot::config::ConfigState;
use realty_feed_bot::ingest::providers::FixtureFeedSource;
use realty_feed_bot::ingest::realty_xml::YANDEX_REALTY_NS;
use realty_feed_bot::ingest::Refresher;
use realty_feed_bot::storage::MemoryStorage;
use realty_feed_bot::transport::{InboundTurn, RecordingTransport};
use realty_feed_bot::ui;

const FEED: &str = include_str!("fixtures/realty_feed.xml");
const ADMIN: i64 = 784810066;
const CHAT: i64 = 100;

async fn bot() -> Bot {
    let storage = Arc::new(MemoryStorage::new());
    let refresher = Arc::new(Refresher::new(
        Arc::new(FixtureFeedSource::from_fixture(FEED)),
        storage.clone(),
        Arc::new(Catalog::default()),
        YANDEX_REALTY_NS,
    ));
    let config = Arc::new(ConfigState::new(
        "https://www.nmls.ru/data/feed/yandex/agency1003479.xml",
        [ADMIN],
    ));
    let bot = Bot::new(refresher, config, storage).with_reveal_pause(Duration::ZERO);

    let t = RecordingTransport::new();
    bot.handle_turn(&InboundTurn::new(CHAT, 1, ui::REFRESH_DATA), &t)
        .await
        .expect("refresh turn");
    assert_eq!(t.texts(), vec![ui::REFRESH_OK]);
    bot
}

async fn say(bot: &Bot, t: &RecordingTransport, user: i64, text: &str) -> Vec<String> {
    t.take();
    bot.handle_turn(&InboundTurn::new(CHAT, user, text), t)
        .await
        .expect("turn");
    t.texts()
}

#[tokio::test]
async fn browse_by_agent_reveals_matching_listings() {
    let bot = bot().await;
    let t = RecordingTransport::new();

    assert_eq!(say(&bot, &t, 1, ui::BROWSE_BY_AGENT).await, vec![ui::ASK_DEAL_TYPE]);
    assert_eq!(say(&bot, &t, 1, ui::DEAL_SALE).await, vec![ui::ASK_AGENT]);

    let sent = t.sent();
    let keyboard = sent[0].1.keyboard.as_ref().expect("agent keyboard");
    assert!(keyboard.contains("👤 Иван Петров"));
    assert!(keyboard.contains("👤 Ольга Смирнова"));

    assert_eq!(say(&bot, &t, 1, "👤 Иван Петров").await, vec![ui::ASK_CATEGORY]);
    assert_eq!(say(&bot, &t, 1, "🏡 Дом").await, vec![ui::ASK_MARKET]);
    assert_eq!(
        say(&bot, &t, 1, ui::MARKET_INTERNAL).await,
        vec!["🔍 Найдено объектов: 1".to_string()]
    );

    let out = say(&bot, &t, 1, ui::REVEAL).await;
    assert_eq!(out.len(), 2);
    assert!(out[0].starts_with("🏠 Дом (Продажа)"), "card: {}", out[0]);
    assert!(out[0].contains("💰 Цена: 7,800,000 RUB"));
    assert!(out[0].ends_with("http://nn.nmls.ru/realty/view/5514"));
    assert_eq!(out[1], ui::MENU);
    assert_eq!(bot.active_sessions().await, 0);
}

#[tokio::test]
async fn browse_by_category_with_room_bucket() {
    let bot = bot().await;
    let t = RecordingTransport::new();

    say(&bot, &t, 1, ui::BROWSE_BY_CATEGORY).await;
    assert_eq!(say(&bot, &t, 1, ui::DEAL_RENT).await, vec![ui::ASK_CATEGORY]);
    say(&bot, &t, 1, "🏠 2-комнатная").await;
    assert_eq!(
        say(&bot, &t, 1, ui::MARKET_ANY).await,
        vec!["🔍 Найдено объектов: 1".to_string()]
    );

    // declining the reveal just returns to the menu
    assert_eq!(say(&bot, &t, 1, ui::CANCEL).await, vec![ui::MENU]);
}

#[tokio::test]
async fn main_menu_abandons_flow_and_discards_criteria() {
    let bot = bot().await;
    let t = RecordingTransport::new();

    say(&bot, &t, 1, ui::BROWSE_BY_CATEGORY).await;
    say(&bot, &t, 1, ui::DEAL_RENT).await;
    assert_eq!(bot.active_sessions().await, 1);

    assert_eq!(say(&bot, &t, 1, ui::MAIN_MENU).await, vec![ui::BACK_TO_MENU]);
    assert_eq!(bot.active_sessions().await, 0);

    // a stale step label at the top level is only a menu hint
    assert_eq!(say(&bot, &t, 1, "🏠 2-комнатная").await, vec![ui::PICK_ACTION]);
}

#[tokio::test]
async fn unknown_labels_fail_closed_in_conversation() {
    let bot = bot().await;
    let t = RecordingTransport::new();

    say(&bot, &t, 1, ui::BROWSE_BY_CATEGORY).await;
    say(&bot, &t, 1, ui::DEAL_SALE).await;
    say(&bot, &t, 1, "🚀 Космодром").await;
    assert_eq!(
        say(&bot, &t, 1, ui::MARKET_ANY).await,
        vec!["🔍 Найдено объектов: 0".to_string()]
    );
    assert_eq!(say(&bot, &t, 1, ui::REVEAL).await, vec![ui::MENU]);
}

#[tokio::test]
async fn admin_button_is_hidden_and_inert_for_others() {
    let bot = bot().await;
    let t = RecordingTransport::new();

    say(&bot, &t, 1, ui::START).await;
    let kb = t.sent()[0].1.keyboard.clone().expect("main keyboard");
    assert!(!kb.contains(ui::CHANGE_FEED_URL));
    assert_eq!(say(&bot, &t, 1, ui::CHANGE_FEED_URL).await, vec![ui::PICK_ACTION]);

    say(&bot, &t, ADMIN, ui::START).await;
    let kb = t.sent()[0].1.keyboard.clone().expect("main keyboard");
    assert!(kb.contains(ui::CHANGE_FEED_URL));
    assert_eq!(say(&bot, &t, ADMIN, ui::CHANGE_FEED_URL).await, vec![ui::ASK_FEED_URL]);
    assert_eq!(
        say(&bot, &t, ADMIN, "https://feed.example/agency2.xml").await,
        vec![ui::URL_SAVED]
    );
    assert_eq!(bot.config().feed_url(), "https://feed.example/agency2.xml");
}
