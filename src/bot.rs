// src/bot.rs
//! Turn dispatcher: owns the per-chat sessions, runs dialogue transitions,
//! executes their effects and delivers the replies through a [`Transport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::{counter, describe_counter, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::config::{BotConfig, ConfigState};
use crate::dialogue::{DialogueSession, Effect, Outgoing, TurnContext};
use crate::ingest::types::validate_feed_url;
use crate::ingest::Refresher;
use crate::storage::Storage;
use crate::transport::{ChatId, InboundTurn, OutboundMessage, Transport};
use crate::ui;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dialogue_turns_total", "User turns processed, by state.");
        describe_counter!("listings_revealed_total", "Listing cards delivered.");
        describe_counter!("feed_url_changes_total", "Admin feed URL changes.");
    });
}

pub struct Bot {
    refresher: Arc<Refresher>,
    config: Arc<ConfigState>,
    storage: Arc<dyn Storage>,
    sessions: Mutex<HashMap<ChatId, DialogueSession>>,
    reveal_pause: Duration,
    listing_url_base: String,
}

impl Bot {
    pub fn new(refresher: Arc<Refresher>, config: Arc<ConfigState>, storage: Arc<dyn Storage>) -> Self {
        Self {
            refresher,
            config,
            storage,
            sessions: Mutex::new(HashMap::new()),
            reveal_pause: Duration::from_millis(500),
            listing_url_base: crate::config::bot::DEFAULT_LISTING_URL_BASE.to_string(),
        }
    }

    /// Apply the presentation settings of a loaded config.
    pub fn configured(self, cfg: &BotConfig) -> Self {
        self.with_reveal_pause(cfg.reveal_pause())
            .with_listing_url_base(cfg.listing_url_base.clone())
    }

    pub fn with_reveal_pause(mut self, pause: Duration) -> Self {
        self.reveal_pause = pause;
        self
    }

    pub fn with_listing_url_base(mut self, base: impl Into<String>) -> Self {
        self.listing_url_base = base.into();
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.refresher.catalog()
    }

    pub fn config(&self) -> &Arc<ConfigState> {
        &self.config
    }

    /// Conversations currently in the middle of a flow.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Process one user turn to completion, replies included.
    pub async fn handle_turn(&self, turn: &InboundTurn, transport: &dyn Transport) -> Result<()> {
        ensure_metrics_described();
        let is_admin = self.config.is_admin(turn.user_id);

        let session = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions.remove(&turn.chat_id).unwrap_or_default();
            gauge!("dialogue_active_sessions").set(sessions.len() as f64);
            session
        };
        let from = session.state.name();
        counter!("dialogue_turns_total", "state" => from).increment(1);

        let snapshot = self.catalog().current();
        let transition = session.advance(
            &turn.text,
            &TurnContext {
                catalog: &snapshot,
                is_admin,
            },
        );

        if let Some(next) = transition.next {
            tracing::debug!(
                target: "dialogue",
                chat_id = turn.chat_id,
                from,
                to = next.state.name(),
                "session advanced"
            );
            let mut sessions = self.sessions.lock().await;
            sessions.insert(turn.chat_id, next);
            gauge!("dialogue_active_sessions").set(sessions.len() as f64);
        }

        self.deliver(turn.chat_id, transition.outgoing, transport).await?;

        if let Some(effect) = transition.effect {
            let reply = self.run_effect(effect, is_admin).await;
            transport.send(turn.chat_id, &reply).await?;
        }
        Ok(())
    }

    async fn deliver(&self, chat_id: ChatId, outgoing: Vec<Outgoing>, transport: &dyn Transport) -> Result<()> {
        let mut previous_was_listing = false;
        for item in outgoing {
            match item {
                Outgoing::Message(msg) => {
                    transport.send(chat_id, &msg).await?;
                    previous_was_listing = false;
                }
                Outgoing::Listing(record) => {
                    if previous_was_listing && !self.reveal_pause.is_zero() {
                        tokio::time::sleep(self.reveal_pause).await;
                    }
                    let card = OutboundMessage::text(ui::format_listing(&record, &self.listing_url_base));
                    transport.send(chat_id, &card).await?;
                    counter!("listings_revealed_total").increment(1);
                    previous_was_listing = true;
                }
            }
        }
        Ok(())
    }

    async fn run_effect(&self, effect: Effect, is_admin: bool) -> OutboundMessage {
        let menu = |text: &str| OutboundMessage::with_keyboard(text, ui::main_keyboard(is_admin));
        match effect {
            Effect::RefreshCatalog => {
                let url = self.config.feed_url();
                // cause is logged by the refresher; the user only sees a generic notice
                match self.refresher.refresh(&url).await {
                    Ok(_) => menu(ui::REFRESH_OK),
                    Err(_) => menu(ui::REFRESH_FAILED),
                }
            }
            Effect::SetFeedUrl(raw) => {
                if !is_admin {
                    return menu(ui::MENU);
                }
                if validate_feed_url(&raw).is_err() {
                    return menu(ui::URL_INVALID);
                }
                match self.config.set_feed_url(&raw, self.storage.as_ref()).await {
                    Ok(()) => {
                        counter!("feed_url_changes_total").increment(1);
                        menu(ui::URL_SAVED)
                    }
                    Err(e) => {
                        tracing::warn!(target: "storage", error = ?e, "feed url not saved");
                        menu(ui::URL_SAVE_FAILED)
                    }
                }
            }
        }
    }
}
