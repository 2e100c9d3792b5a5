//! Bot front end
//!
//! Turns Telegram updates into commands and session events, and runs the
//! long-polling loop.

use crate::directory::{ChatId, Role};
use crate::runtime::{ChatTransport, RelayManager, UpdateSource};
use crate::state_machine::{ChatRef, Event};
use crate::telegram::Update;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Pause after a failed poll before asking again
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Send,
    Cancel,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "send" => Some(Command::Send),
            "cancel" => Some(Command::Cancel),
            _ => None,
        }
    }
}

/// Command name of a `/command@botname args` message, if it is one
pub fn command_name(text: &str) -> Option<&str> {
    let word = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
    let name = word.split_once('@').map_or(word, |(name, _bot)| name);
    (!name.is_empty()).then_some(name)
}

/// What an update asks of the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Start(ChatRef),
    Help(ChatRef),
    Session(ChatRef, Event),
}

impl Inbound {
    pub fn from_update(update: &Update) -> Option<Self> {
        if let Some(message) = &update.message {
            let chat = ChatRef::new(message.chat.id, message.chat.username.clone());
            let text = message.text.as_deref()?;

            return match command_name(text) {
                Some(name) => match Command::from_name(name) {
                    Some(Command::Start) => Some(Inbound::Start(chat)),
                    Some(Command::Help) => Some(Inbound::Help(chat)),
                    Some(Command::Send) => Some(Inbound::Session(chat, Event::SendCommand)),
                    Some(Command::Cancel) => Some(Inbound::Session(chat, Event::CancelCommand)),
                    None => None,
                },
                None => Some(Inbound::Session(
                    chat,
                    Event::TextMessage {
                        text: text.to_string(),
                    },
                )),
            };
        }

        let query = update.callback_query.as_ref()?;
        let role = Role::from_callback_data(query.data.as_deref()?)?;
        let chat = query.message.as_ref().map_or_else(
            || ChatRef::new(ChatId(query.from.id), query.from.username.clone()),
            |message| ChatRef::new(message.chat.id, message.chat.username.clone()),
        );
        Some(Inbound::Session(chat, Event::ChooseRecipient { role }))
    }
}

/// Hand an inbound request to the manager
pub async fn route<T: ChatTransport + 'static>(manager: &RelayManager<T>, inbound: Inbound) {
    match inbound {
        Inbound::Start(chat) => {
            if let Err(e) = manager.start(&chat).await {
                tracing::warn!(chat_id = %chat.chat_id, error = %e, "Failed to answer /start");
            }
        }
        Inbound::Help(chat) => {
            if let Err(e) = manager.help(&chat).await {
                tracing::warn!(chat_id = %chat.chat_id, error = %e, "Failed to answer /help");
            }
        }
        Inbound::Session(chat, event) => manager.dispatch(chat, event).await,
    }
}

/// Long-polling bot
pub struct Bot<S, T>
where
    S: UpdateSource,
    T: ChatTransport + 'static,
{
    source: Arc<S>,
    manager: Arc<RelayManager<T>>,
    poll_timeout: Duration,
}

impl<S, T> Bot<S, T>
where
    S: UpdateSource,
    T: ChatTransport + 'static,
{
    pub fn new(source: Arc<S>, manager: Arc<RelayManager<T>>, poll_timeout: Duration) -> Self {
        Self {
            source,
            manager,
            poll_timeout,
        }
    }

    /// Poll until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset: Option<i64> = None;
        tracing::info!("Polling for updates");

        loop {
            let polled = tokio::select! {
                () = &mut shutdown => break,
                polled = self.source.get_updates(offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.handle_update(&update).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Polling for updates failed");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(POLL_ERROR_PAUSE) => {}
                    }
                }
            }
        }

        tracing::info!("Bot stopped");
    }

    async fn handle_update(&self, update: &Update) {
        if let Some(query) = &update.callback_query {
            if let Err(e) = self.source.answer_callback_query(&query.id).await {
                tracing::debug!(error = %e, "Failed to answer callback query");
            }
        }

        match Inbound::from_update(update) {
            Some(inbound) => route(&self.manager, inbound).await,
            None => tracing::debug!(update_id = update.update_id, "Ignoring update"),
        }
    }
}
