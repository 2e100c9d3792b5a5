//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::directory::{ChatId, PlayerDirectory};
use crate::state_machine::ChoiceMenu;
use crate::telegram::{TelegramError, Update};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Build a directory from inline players-file content
pub fn directory_from(csv: &str) -> PlayerDirectory {
    PlayerDirectory::from_reader(csv.as_bytes()).unwrap()
}

/// A call made through the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Reply {
        chat_id: ChatId,
        text: String,
        menu: Option<ChoiceMenu>,
    },
    Message {
        chat_id: ChatId,
        text: String,
    },
}

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that records every call
pub struct MockTransport {
    calls: Mutex<Vec<Outbound>>,
    /// Signalled after each recorded call (for test synchronization)
    recorded: Notify,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            recorded: Notify::new(),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Make `send_message` fail from now on
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Outbound> {
        self.calls.lock().unwrap().clone()
    }

    /// Relayed messages as `(target, text)`
    pub fn sent_messages(&self) -> Vec<(ChatId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Outbound::Message { chat_id, text } => Some((chat_id, text)),
                Outbound::Reply { .. } => None,
            })
            .collect()
    }

    /// Reply texts sent to one chat, in order
    pub fn replies_to(&self, target: ChatId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Outbound::Reply { chat_id, text, .. } if chat_id == target => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Wait until at least `count` calls were recorded
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let recorded = self.calls.lock().unwrap().len();
            if recorded >= count {
                return;
            }
            self.recorded.notified().await;
        }
    }

    fn record(&self, call: Outbound) {
        self.calls.lock().unwrap().push(call);
        self.recorded.notify_one();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn reply_to_chat(
        &self,
        chat_id: ChatId,
        text: &str,
        menu: Option<&ChoiceMenu>,
    ) -> Result<(), TransportError> {
        self.record(Outbound::Reply {
            chat_id,
            text: text.to_string(),
            menu: menu.cloned(),
        });
        Ok(())
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::new("mock send failure"));
        }
        self.record(Outbound::Message {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Mock Update Source
// ============================================================================

/// Update source that replays scripted poll results, then waits forever
#[derive(Default)]
pub struct MockUpdateSource {
    polls: Mutex<VecDeque<Result<Vec<Update>, TelegramError>>>,
    offsets: Mutex<Vec<Option<i64>>>,
    answered: Mutex<Vec<String>>,
}

impl MockUpdateSource {
    pub fn new(polls: Vec<Result<Vec<Update>, TelegramError>>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
            ..Self::default()
        }
    }

    /// Offsets passed to each `get_updates` call
    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }

    /// Callback query ids that were acknowledged
    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpdateSource for MockUpdateSource {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        _timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.polls.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        self.answered
            .lock()
            .unwrap()
            .push(callback_query_id.to_string());
        Ok(())
    }
}
