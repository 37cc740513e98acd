// src/transport/telegram.rs
//! Telegram through `teloxide`: the dispatcher polls updates and hands each
//! chat's messages to its own worker, `send_message` carries replies out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::counter;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::dptree;
use teloxide::payloads::SendMessageSetters;
use teloxide::requests::{Request, Requester, ResponseResult};
use teloxide::types::{ChatId as TgChatId, KeyboardButton, KeyboardMarkup, Message, Update};
use teloxide::RequestError;

use super::{ChatId, InboundTurn, OutboundMessage, Transport};
use crate::bot::Bot;
use crate::ui::Keyboard;

/// Pause before dispatching again after the dispatcher stopped.
pub const RESTART_DELAY: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TelegramTransport {
    api: teloxide::Bot,
    max_attempts: u8,
}

impl TelegramTransport {
    pub fn new(token: impl Into<String>) -> Self {
        Self::from_api(teloxide::Bot::new(token))
    }

    pub fn from_api(api: teloxide::Bot) -> Self {
        Self { api, max_attempts: 3 }
    }

    pub fn with_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn api(&self) -> &teloxide::Bot {
        &self.api
    }
}

/// Delay before retrying a failed send, or `None` when retrying cannot help.
///
/// Flood control answers carry their own wait; transport errors back off.
fn retry_delay(err: &RequestError, attempt: u8) -> Option<Duration> {
    match err {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        RequestError::Network(_) | RequestError::Io(_) => {
            Some(Duration::from_millis(500u64 << attempt.saturating_sub(1).min(4)))
        }
        _ => None,
    }
}

/// Reply keyboard for a [`Keyboard`], resized to fit its labels.
pub fn markup(kb: &Keyboard) -> KeyboardMarkup {
    KeyboardMarkup::new(
        kb.rows
            .iter()
            .map(|row| row.iter().map(|label| KeyboardButton::new(label.clone())).collect::<Vec<_>>()),
    )
    .resize_keyboard()
}

#[async_trait::async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, chat_id: ChatId, message: &OutboundMessage) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let mut req = self.api.send_message(TgChatId(chat_id), message.text.clone());
            if let Some(kb) = &message.keyboard {
                req = req.reply_markup(markup(kb));
            }
            let err = match req.send().await {
                Ok(_) => return Ok(()),
                Err(e) => e,
            };
            match retry_delay(&err, attempt) {
                Some(wait) if attempt < self.max_attempts => {
                    tracing::debug!(target: "transport", chat_id, attempt, wait_ms = wait.as_millis() as u64, error = %err, "send retry");
                    tokio::time::sleep(wait).await;
                }
                _ => {
                    counter!("transport_send_errors_total").increment(1);
                    return Err(anyhow::Error::new(err).context(format!("telegram sendMessage to {chat_id}")));
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

/// Text messages only; stickers, photos and service messages are skipped.
pub fn turn_from_message(msg: &Message) -> Option<InboundTurn> {
    let text = msg.text()?;
    let user_id = msg
        .from
        .as_ref()
        .and_then(|u| i64::try_from(u.id.0).ok())
        .unwrap_or(msg.chat.id.0);
    Some(InboundTurn::new(msg.chat.id.0, user_id, text))
}

async fn on_message(msg: Message, bot: Arc<Bot>, transport: Arc<TelegramTransport>) -> ResponseResult<()> {
    let Some(turn) = turn_from_message(&msg) else {
        return Ok(());
    };
    if let Err(e) = bot.handle_turn(&turn, transport.as_ref()).await {
        tracing::warn!(target: "transport", error = ?e, chat_id = turn.chat_id, "turn failed");
    }
    Ok(())
}

/// Dispatch updates until the process ends.
///
/// Turns of one chat run in order; different chats are served concurrently,
/// so a paced reveal in one conversation never holds up another.
pub async fn run_polling(bot: Arc<Bot>, transport: Arc<TelegramTransport>) {
    loop {
        tracing::info!(target: "transport", "telegram polling started");
        let handler = Update::filter_message().endpoint(on_message);
        Dispatcher::builder(transport.api().clone(), handler)
            .dependencies(dptree::deps![bot.clone(), transport.clone()])
            .distribution_function(|upd: &Update| upd.chat().map(|c| c.id))
            .default_handler(|_| async {})
            .build()
            .dispatch()
            .await;

        counter!("transport_poll_restarts_total").increment(1);
        tracing::warn!(
            target: "transport",
            retry_in_secs = RESTART_DELAY.as_secs(),
            "telegram dispatcher stopped"
        );
        tokio::time::sleep(RESTART_DELAY).await;
    }
}
