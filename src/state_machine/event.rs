//! Events that can occur in a chat session

use crate::directory::Role;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    SendCommand,
    ChooseRecipient {
        role: Role,
    },
    TextMessage {
        text: String,
    },
    CancelCommand,

    // Runtime events
    /// No input arrived within the configured idle limit
    SessionExpired,
}

impl Event {
    /// Short name for logs. Message text is never logged.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SendCommand => "send_command",
            Event::ChooseRecipient { .. } => "choose_recipient",
            Event::TextMessage { .. } => "text_message",
            Event::CancelCommand => "cancel_command",
            Event::SessionExpired => "session_expired",
        }
    }
}
