//! Chat session state types

use crate::directory::{ChatId, DirectoryError, PlayerDirectory, Role};

/// Session state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConvState {
    /// No message in progress
    #[default]
    Idle,

    /// Recipient menu shown, waiting for a button press
    ChoosingRecipient,

    /// Recipient chosen, waiting for the text to relay
    AwaitingText { role: Role },
}

impl ConvState {
    /// Check if a message is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self, ConvState::Idle)
    }
}

/// The chat a session belongs to, as seen on the latest inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRef {
    pub chat_id: ChatId,
    pub username: Option<String>,
}

impl ChatRef {
    pub fn new(chat_id: ChatId, username: Option<String>) -> Self {
        Self { chat_id, username }
    }
}

/// Read-only inputs for a transition
#[derive(Debug, Clone, Copy)]
pub struct ConvContext<'a> {
    pub chat: &'a ChatRef,
    pub directory: &'a PlayerDirectory,
}

impl<'a> ConvContext<'a> {
    pub fn new(chat: &'a ChatRef, directory: &'a PlayerDirectory) -> Self {
        Self { chat, directory }
    }

    /// Resolve the requester's `role` contact to a chat id
    pub fn recipient_chat(&self, role: Role) -> Result<ChatId, DirectoryError> {
        let username = self
            .chat
            .username
            .as_deref()
            .ok_or(DirectoryError::NoUsername)?;
        self.directory.recipient_chat(username, role)
    }
}
