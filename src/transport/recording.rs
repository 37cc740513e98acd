// src/transport/recording.rs
use std::sync::Mutex;

use anyhow::Result;

use super::{ChatId, OutboundMessage, Transport};

/// Keeps every sent message in memory; backs the HTTP `/turn` endpoint and tests.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChatId, OutboundMessage)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(ChatId, OutboundMessage)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drain the recorded messages.
    pub fn take(&self) -> Vec<(ChatId, OutboundMessage)> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, m)| m.text).collect()
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, chat_id: ChatId, message: &OutboundMessage) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((chat_id, message.clone()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
