//! Effects produced by state transitions

use crate::directory::{ChatId, Role};

/// A button offered under a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuButton {
    pub label: String,
    /// Payload sent back when the button is pressed
    pub data: String,
}

/// Transport-neutral choice menu, one inner `Vec` per row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceMenu {
    pub rows: Vec<Vec<MenuButton>>,
}

impl ChoiceMenu {
    /// One row per recipient role
    pub fn recipients() -> Self {
        Self {
            rows: Role::ALL
                .into_iter()
                .map(|role| {
                    vec![MenuButton {
                        label: role.label().to_string(),
                        data: role.as_str().to_string(),
                    }]
                })
                .collect(),
        }
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Answer the chat that drives the session
    Reply {
        chat_id: ChatId,
        text: String,
        menu: Option<ChoiceMenu>,
    },

    /// Deliver relayed text to another player's chat
    Relay { chat_id: ChatId, text: String },
}

impl Effect {
    pub fn reply(chat_id: ChatId, text: impl Into<String>) -> Self {
        Effect::Reply {
            chat_id,
            text: text.into(),
            menu: None,
        }
    }

    pub fn reply_with_menu(chat_id: ChatId, text: impl Into<String>, menu: ChoiceMenu) -> Self {
        Effect::Reply {
            chat_id,
            text: text.into(),
            menu: Some(menu),
        }
    }

    pub fn relay(chat_id: ChatId, text: impl Into<String>) -> Self {
        Effect::Relay {
            chat_id,
            text: text.into(),
        }
    }
}
