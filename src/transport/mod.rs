// src/transport/mod.rs
//! Chat transport seam: inbound turns in, outbound messages with reply keyboards out.

pub mod recording;
pub mod telegram;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ui::Keyboard;

pub type ChatId = i64;
pub type UserId = i64;

pub use recording::RecordingTransport;
pub use telegram::TelegramTransport;

/// One user message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundTurn {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

impl InboundTurn {
    pub fn new(chat_id: ChatId, user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    /// `None` keeps whatever keyboard the chat currently shows.
    #[serde(default)]
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: ChatId, message: &OutboundMessage) -> Result<()>;
    fn name(&self) -> &'static str;
}
