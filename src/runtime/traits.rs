//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the session runtime with mock implementations.

use crate::directory::ChatId;
use crate::state_machine::ChoiceMenu;
use crate::telegram::{TelegramError, Update};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Delivery failure reported by a transport. Never retried.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Answer a chat, optionally offering a choice menu
    async fn reply_to_chat(
        &self,
        chat_id: ChatId,
        text: &str,
        menu: Option<&ChoiceMenu>,
    ) -> Result<(), TransportError>;

    /// Deliver a relayed message to a player's chat
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError>;
}

/// Inbound side of the chat platform
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Long-poll for updates after `offset`
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError>;

    /// Acknowledge a button press
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn reply_to_chat(
        &self,
        chat_id: ChatId,
        text: &str,
        menu: Option<&ChoiceMenu>,
    ) -> Result<(), TransportError> {
        (**self).reply_to_chat(chat_id, text, menu).await
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        (**self).send_message(chat_id, text).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::telegram::{InlineKeyboardMarkup, TelegramClient};

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn reply_to_chat(
        &self,
        chat_id: ChatId,
        text: &str,
        menu: Option<&ChoiceMenu>,
    ) -> Result<(), TransportError> {
        self.send_text(chat_id, text, menu.map(InlineKeyboardMarkup::from))
            .await
            .map(|_| ())
            .map_err(|e| TransportError::new(e.to_string()))
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.send_text(chat_id, text, None)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::new(e.to_string()))
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        TelegramClient::get_updates(self, offset, timeout).await
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        TelegramClient::answer_callback_query(self, callback_query_id)
            .await
            .map(|_| ())
    }
}
