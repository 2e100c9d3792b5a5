//! Runtime for chat sessions
//!
//! Each chat that starts a message gets its own session task. Events for one
//! chat are serialized through that task's channel; different chats run
//! concurrently and share only the player directory.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::directory::{ChatId, PlayerDirectory};
use crate::state_machine::transition::NOT_REGISTERED;
use crate::state_machine::{ChatRef, Event, TransitionError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

pub const GREETING: &str =
    "Hi! Use /send to send a message to your angel or mortal and /cancel to cancel message";
pub const HELP: &str = "Use /send to send a message to your angel or mortal and /cancel to cancel message";
pub const NO_USERNAME: &str =
    "Sorry, you need a Telegram username to use this bot. Set one and send /start again.";

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// An event addressed to one chat's session
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub chat: ChatRef,
    pub event: Event,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Reset active sessions after this much silence. `None` keeps them forever.
    pub session_timeout: Option<Duration>,
    /// Per-session event buffer
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session_timeout: None,
            channel_capacity: 16,
        }
    }
}

/// Handle to interact with a running session
pub struct SessionHandle {
    /// Distinguishes this task from a later one for the same chat
    pub id: u64,
    pub event_tx: mpsc::Sender<ChatEvent>,
}

/// Live sessions by chat. A session task removes its own entry when it
/// retires, under the write lock, so senders holding the read lock never
/// lose an event to a task that is shutting down.
pub type SessionMap = RwLock<HashMap<ChatId, SessionHandle>>;

/// Manager for all chat sessions
pub struct RelayManager<T: ChatTransport + 'static> {
    directory: Arc<PlayerDirectory>,
    transport: Arc<T>,
    config: RuntimeConfig,
    sessions: Arc<SessionMap>,
    next_session_id: AtomicU64,
}

impl<T: ChatTransport + 'static> RelayManager<T> {
    pub fn new(directory: Arc<PlayerDirectory>, transport: Arc<T>, config: RuntimeConfig) -> Self {
        Self {
            directory,
            transport,
            config,
            sessions: Arc::default(),
            next_session_id: AtomicU64::new(0),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn directory(&self) -> &Arc<PlayerDirectory> {
        &self.directory
    }

    /// Handle `/start`: remember the player's chat and greet them
    pub async fn start(&self, chat: &ChatRef) -> Result<(), TransportError> {
        let reply = match chat.username.as_deref() {
            Some(username) => match self.directory.set_chat_id(username, chat.chat_id) {
                Ok(()) => GREETING,
                Err(e) => {
                    tracing::warn!(chat_id = %chat.chat_id, error = %e, "Start from unregistered user");
                    NOT_REGISTERED
                }
            },
            None => {
                tracing::warn!(chat_id = %chat.chat_id, "Start from chat without username");
                NO_USERNAME
            }
        };
        self.transport.reply_to_chat(chat.chat_id, reply, None).await
    }

    /// Handle `/help`
    pub async fn help(&self, chat: &ChatRef) -> Result<(), TransportError> {
        self.transport.reply_to_chat(chat.chat_id, HELP, None).await
    }

    /// Route a conversation event to its chat's session
    ///
    /// Only `/send` opens a session. Other events for a chat without one are
    /// dropped, and so is anything for a session whose queue is full.
    pub async fn dispatch(&self, chat: ChatRef, event: Event) {
        let chat_id = chat.chat_id;
        let chat_event = ChatEvent { chat, event };

        let chat_event = {
            let sessions = self.sessions.read().await;
            match sessions.get(&chat_id) {
                Some(handle) => match offer(handle, chat_event) {
                    Some(unsent) => unsent,
                    None => return,
                },
                None => chat_event,
            }
        };

        if chat_event.event != Event::SendCommand {
            tracing::debug!(
                chat_id = %chat_id,
                event = chat_event.event.kind(),
                "No open session, dropping event"
            );
            return;
        }

        let mut sessions = self.sessions.write().await;
        // Another dispatch may have opened the session meanwhile
        let chat_event = match sessions.get(&chat_id) {
            Some(handle) => match offer(handle, chat_event) {
                Some(unsent) => unsent,
                None => return,
            },
            None => chat_event,
        };

        let handle = self.spawn_session(&chat_event.chat);
        if offer(&handle, chat_event).is_some() {
            tracing::error!(chat_id = %chat_id, "Failed to deliver event to new session");
        }
        sessions.insert(chat_id, handle);
    }

    /// Number of chats with a live session task
    #[allow(dead_code)] // Used in tests
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn spawn_session(&self, chat: &ChatRef) -> SessionHandle {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let runtime = SessionRuntime::new(
            chat.clone(),
            Arc::clone(&self.directory),
            Arc::clone(&self.transport),
            self.config.session_timeout,
            event_rx,
        )
        .with_registry(id, Arc::clone(&self.sessions));
        tokio::spawn(runtime.run());
        tracing::debug!(chat_id = %chat.chat_id, session_id = id, "Spawned session runtime");

        SessionHandle { id, event_tx }
    }
}

/// Queue an event without waiting. Returns the event if the session task is
/// gone; a full queue drops it.
fn offer(handle: &SessionHandle, chat_event: ChatEvent) -> Option<ChatEvent> {
    match handle.event_tx.try_send(chat_event) {
        Ok(()) => None,
        Err(TrySendError::Full(dropped)) => {
            tracing::warn!(
                chat_id = %dropped.chat.chat_id,
                event = dropped.event.kind(),
                "Session queue full, dropping event"
            );
            None
        }
        Err(TrySendError::Closed(unsent)) => {
            tracing::warn!(chat_id = %unsent.chat.chat_id, "Session task gone");
            Some(unsent)
        }
    }
}
