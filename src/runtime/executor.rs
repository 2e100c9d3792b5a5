//! Chat session runtime executor

use super::traits::{ChatTransport, TransportError};
use super::{ChatEvent, RuntimeError, SessionMap};

use crate::directory::PlayerDirectory;
use crate::state_machine::{transition, ChatRef, ConvContext, ConvState, Effect, Event};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Drives one chat's session: feeds events through `transition` and
/// executes the resulting effects in order
pub struct SessionRuntime<T>
where
    T: ChatTransport + 'static,
{
    chat: ChatRef,
    state: ConvState,
    directory: Arc<PlayerDirectory>,
    transport: Arc<T>,
    /// Reset an active session after this much silence
    session_timeout: Option<Duration>,
    event_rx: mpsc::Receiver<ChatEvent>,
    /// Map entry to drop on retirement, keyed by this task's handle id
    registry: Option<(u64, Arc<SessionMap>)>,
}

impl<T> SessionRuntime<T>
where
    T: ChatTransport + 'static,
{
    pub fn new(
        chat: ChatRef,
        directory: Arc<PlayerDirectory>,
        transport: Arc<T>,
        session_timeout: Option<Duration>,
        event_rx: mpsc::Receiver<ChatEvent>,
    ) -> Self {
        Self {
            chat,
            state: ConvState::Idle,
            directory,
            transport,
            session_timeout,
            event_rx,
            registry: None,
        }
    }

    /// Remove the handle with `id` from `sessions` when this session retires
    pub fn with_registry(mut self, id: u64, sessions: Arc<SessionMap>) -> Self {
        self.registry = Some((id, sessions));
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn state(&self) -> ConvState {
        self.state.clone()
    }

    /// Process events until the session is back to `Idle` with nothing
    /// queued, or every sender is gone
    pub async fn run(mut self) {
        tracing::debug!(chat_id = %self.chat.chat_id, "Starting session runtime");
        let mut deadline: Option<Instant> = None;

        loop {
            let next = match deadline {
                Some(at) => {
                    tokio::select! {
                        next = self.event_rx.recv() => next,
                        () = tokio::time::sleep_until(at) => Some(ChatEvent {
                            chat: self.chat.clone(),
                            event: Event::SessionExpired,
                        }),
                    }
                }
                None => self.event_rx.recv().await,
            };
            let Some(chat_event) = next else { break };

            match self.process_event(chat_event).await {
                Ok(()) => deadline = self.idle_deadline(),
                Err(RuntimeError::Transition(e)) => {
                    tracing::debug!(chat_id = %self.chat.chat_id, error = %e, "Ignoring event");
                }
                Err(e) => {
                    tracing::warn!(chat_id = %self.chat.chat_id, error = %e, "Error handling event");
                    deadline = self.idle_deadline();
                }
            }

            if !self.state.is_active() && self.retire().await {
                break;
            }
        }

        tracing::debug!(chat_id = %self.chat.chat_id, "Session runtime stopped");
    }

    /// When an active session expires, counted from the last accepted event
    fn idle_deadline(&self) -> Option<Instant> {
        let limit = self.session_timeout.filter(|_| self.state.is_active())?;
        Instant::now().checked_add(limit)
    }

    /// Drop this session's map entry unless more events are already queued
    async fn retire(&self) -> bool {
        let Some((id, sessions)) = &self.registry else {
            return self.event_rx.is_empty();
        };
        let mut sessions = sessions.write().await;
        if !self.event_rx.is_empty() {
            return false;
        }
        if sessions.get(&self.chat.chat_id).is_some_and(|handle| handle.id == *id) {
            sessions.remove(&self.chat.chat_id);
        }
        true
    }

    /// Apply one event. Rejected events leave the state untouched. A
    /// transport failure stops the remaining effects but keeps the new state.
    pub async fn process_event(&mut self, chat_event: ChatEvent) -> Result<(), RuntimeError> {
        let ChatEvent { chat, event } = chat_event;
        self.chat = chat;
        let kind = event.kind();

        let result = {
            let context = ConvContext::new(&self.chat, &self.directory);
            transition(&self.state, &context, event)?
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state.is_active() && kind == "send_command" {
            tracing::debug!(chat_id = %self.chat.chat_id, "Restarting open session");
        }
        tracing::info!(
            chat_id = %self.chat.chat_id,
            username = ?self.chat.username,
            event = kind,
            from = ?old_state,
            to = ?self.state,
            "Session transition"
        );

        for effect in result.effects {
            self.execute_effect(effect).await?;
        }
        Ok(())
    }

    async fn execute_effect(&self, effect: Effect) -> Result<(), TransportError> {
        match effect {
            Effect::Reply {
                chat_id,
                text,
                menu,
            } => self.transport.reply_to_chat(chat_id, &text, menu.as_ref()).await,

            Effect::Relay { chat_id, text } => {
                self.transport.send_message(chat_id, &text).await?;
                tracing::info!(
                    from = ?self.chat.username,
                    to = %chat_id,
                    chars = text.chars().count(),
                    "Relayed message"
                );
                Ok(())
            }
        }
    }
}
