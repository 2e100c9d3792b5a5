//! Pure state transition function

use super::{ChoiceMenu, ConvContext, ConvState, Effect, Event};
use crate::directory::{ChatId, DirectoryError, Role};
use thiserror::Error;

pub const CHOOSE_RECIPIENT_PROMPT: &str = "Who do you want to send your message to:";
pub const MESSAGE_SENT: &str = "Message sent!";
pub const SEND_CANCELLED: &str = "Sending message cancelled.";
pub const SESSION_EXPIRED: &str =
    "Your message was not sent because you took too long. Use /send to start again.";
pub const NOT_REGISTERED: &str = "Sorry, you are not registered as a player";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same state, directory contents and event it always produces
/// the same result. The directory is only read.
pub fn transition(
    state: &ConvState,
    context: &ConvContext<'_>,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let chat_id = context.chat.chat_id;

    match (state, event) {
        // Any + SendCommand -> ChoosingRecipient. An open session restarts.
        (_, Event::SendCommand) => Ok(TransitionResult::new(ConvState::ChoosingRecipient)
            .with_effect(Effect::reply_with_menu(
                chat_id,
                CHOOSE_RECIPIENT_PROMPT,
                ChoiceMenu::recipients(),
            ))),

        // ChoosingRecipient + ChooseRecipient -> AwaitingText, if the target can be reached
        (ConvState::ChoosingRecipient, Event::ChooseRecipient { role }) => {
            match context.recipient_chat(role) {
                Ok(_) => Ok(TransitionResult::new(ConvState::AwaitingText { role })
                    .with_effect(Effect::reply(
                        chat_id,
                        format!("Please type your message to your {role}"),
                    ))),
                Err(e) => Ok(end_with_failure(chat_id, role, &e)),
            }
        }

        // AwaitingText + TextMessage -> Idle, relaying to the target as resolved now
        (ConvState::AwaitingText { role }, Event::TextMessage { text }) => {
            match context.recipient_chat(*role) {
                Ok(target) => Ok(TransitionResult::new(ConvState::Idle)
                    .with_effect(Effect::relay(target, text))
                    .with_effect(Effect::reply(chat_id, MESSAGE_SENT))),
                Err(e) => Ok(end_with_failure(chat_id, *role, &e)),
            }
        }

        (ConvState::ChoosingRecipient | ConvState::AwaitingText { .. }, Event::CancelCommand) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::reply(chat_id, SEND_CANCELLED)))
        }

        (ConvState::ChoosingRecipient | ConvState::AwaitingText { .. }, Event::SessionExpired) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::reply(chat_id, SESSION_EXPIRED)))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {}",
            event.kind()
        ))),
    }
}

/// Notice shown when the target chat cannot be resolved
pub fn failure_notice(role: Role, error: &DirectoryError) -> String {
    match error {
        DirectoryError::UnresolvedRecipient { .. } => {
            format!("Sorry your {role} has not started this bot")
        }
        DirectoryError::NoRelationship { .. } => format!("Sorry, you have no {role} assigned"),
        DirectoryError::NoUsername | DirectoryError::UnknownUser(_) => NOT_REGISTERED.to_string(),
    }
}

fn end_with_failure(chat_id: ChatId, role: Role, error: &DirectoryError) -> TransitionResult {
    TransitionResult::new(ConvState::Idle).with_effect(Effect::reply(chat_id, failure_notice(role, error)))
}
