//! HTTP client for the Bot API

use super::types::*;
use super::TelegramError;
use crate::directory::ChatId;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Update kinds the bot consumes
const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Extra time on top of the long-poll timeout before the HTTP request is abandoned
const REQUEST_GRACE: Duration = Duration::from_secs(10);

pub struct TelegramClient {
    client: Client,
    /// `{api_url}/bot{token}`
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str, api_url: &str, poll_timeout: Duration) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(poll_timeout.saturating_add(REQUEST_GRACE))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(params)
            .send()
            .await?;
        let envelope: ApiResponse<R> = response.json().await?;
        envelope.into_result(method)
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("getUpdates", &params).await
    }

    pub async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        let params = SendMessageParams {
            chat_id,
            text,
            reply_markup,
        };
        let message: Message = self.call("sendMessage", &params).await?;
        tracing::debug!(chat_id = %chat_id, message_id = message.message_id, "Sent message");
        Ok(message)
    }

    /// Acknowledge a button press so the client stops its progress indicator
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<bool, TelegramError> {
        self.call(
            "answerCallbackQuery",
            &AnswerCallbackQueryParams { callback_query_id },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_unbounded_poll_timeout() {
        let client = TelegramClient::new("123:abc", "http://localhost:8081/", Duration::MAX).unwrap();
        assert_eq!(client.base_url, "http://localhost:8081/bot123:abc");
    }
}
