//! Telegram Bot API transport
//!
//! Just the methods the relay needs: long-polled `getUpdates`,
//! `sendMessage` and `answerCallbackQuery`.

mod client;
mod types;

pub use client::TelegramClient;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("{method} failed ({code}): {description}")]
    Api {
        method: String,
        code: i32,
        description: String,
    },
    #[error("{method} returned no result")]
    EmptyResult { method: String },
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL embeds the bot token
        TelegramError::Http(e.without_url())
    }
}
