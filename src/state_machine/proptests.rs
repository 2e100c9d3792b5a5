//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::directory::{ChatId, PlayerDirectory, Role};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

const PLAYERS: [&str; 4] = ["alice", "bob", "carol", "dave"];

/// Directory over `PLAYERS` with random links; `started[i]` decides whether
/// player `i` has a chat id.
fn build_directory(links: &[(usize, usize)], started: &[bool]) -> PlayerDirectory {
    let mut csv = String::from("player,angel,mortal\n");
    for (player, (angel, mortal)) in PLAYERS.iter().zip(links) {
        csv.push_str(&format!("{player},{},{}\n", PLAYERS[*angel], PLAYERS[*mortal]));
    }
    let dir = PlayerDirectory::from_reader(csv.as_bytes()).unwrap();
    for (i, (name, on)) in PLAYERS.iter().zip(started).enumerate() {
        if *on {
            dir.set_chat_id(name, ChatId(100 + i64::try_from(i).unwrap())).unwrap();
        }
    }
    dir
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Angel), Just(Role::Mortal)]
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::Idle),
        Just(ConvState::ChoosingRecipient),
        arb_role().prop_map(|role| ConvState::AwaitingText { role }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::SendCommand),
        arb_role().prop_map(|role| Event::ChooseRecipient { role }),
        "[a-zA-Z !?]{0,30}".prop_map(|text| Event::TextMessage { text }),
        Just(Event::CancelCommand),
        Just(Event::SessionExpired),
    ]
}

fn arb_directory() -> impl Strategy<Value = PlayerDirectory> {
    (
        proptest::collection::vec((0..PLAYERS.len(), 0..PLAYERS.len()), PLAYERS.len()),
        proptest::collection::vec(any::<bool>(), PLAYERS.len()),
    )
        .prop_map(|(links, started)| build_directory(&links, &started))
}

fn arb_chat() -> impl Strategy<Value = ChatRef> {
    prop_oneof![
        (0..PLAYERS.len()).prop_map(|i| ChatRef::new(ChatId(-1), Some(PLAYERS[i].to_string()))),
        Just(ChatRef::new(ChatId(-1), Some("mallory".to_string()))),
        Just(ChatRef::new(ChatId(-1), None)),
    ]
}

// ============================================================================
// Effect Checkers
// ============================================================================

fn replies_to(effects: &[Effect], chat_id: ChatId) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::Reply { chat_id: c, .. } if *c == chat_id))
        .count()
}

fn relays(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::Relay { .. }))
        .count()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Accepted transitions answer the requester exactly once
    #[test]
    fn prop_one_reply_per_transition(
        state in arb_state(),
        event in arb_event(),
        dir in arb_directory(),
        chat in arb_chat(),
    ) {
        if let Ok(result) = transition(&state, &ConvContext::new(&chat, &dir), event) {
            prop_assert_eq!(replies_to(&result.effects, chat.chat_id), 1);
        }
    }

    // Relays only leave AwaitingText, only on text, and always end the session
    #[test]
    fn prop_relay_only_from_awaiting_text(
        state in arb_state(),
        event in arb_event(),
        dir in arb_directory(),
        chat in arb_chat(),
    ) {
        let is_text = matches!(event, Event::TextMessage { .. });
        if let Ok(result) = transition(&state, &ConvContext::new(&chat, &dir), event) {
            let count = relays(&result.effects);
            prop_assert!(count <= 1);
            if count == 1 {
                prop_assert!(
                    matches!(state, ConvState::AwaitingText { .. }),
                    "relay from {:?}",
                    state
                );
                prop_assert!(is_text, "relay without text");
                prop_assert_eq!(result.new_state, ConvState::Idle);
            }
        }
    }

    // Cancel always ends an active session without relaying
    #[test]
    fn prop_cancel_never_relays(
        state in arb_state(),
        dir in arb_directory(),
        chat in arb_chat(),
    ) {
        let result = transition(&state, &ConvContext::new(&chat, &dir), Event::CancelCommand);
        if state.is_active() {
            let result = result.unwrap();
            prop_assert_eq!(result.new_state, ConvState::Idle);
            prop_assert_eq!(relays(&result.effects), 0);
        } else {
            prop_assert!(result.is_err());
        }
    }

    // The relay target is the chat the directory resolves at send time
    #[test]
    fn prop_relay_targets_resolved_chat(
        role in arb_role(),
        text in "[a-zA-Z ]{1,30}",
        dir in arb_directory(),
        chat in arb_chat(),
    ) {
        let state = ConvState::AwaitingText { role };
        let ctx = ConvContext::new(&chat, &dir);
        let expected = ctx.recipient_chat(role);
        let result = transition(&state, &ctx, Event::TextMessage { text: text.clone() }).unwrap();

        match expected {
            Ok(target) => prop_assert!(result.effects.contains(&Effect::relay(target, text))),
            Err(_) => prop_assert_eq!(relays(&result.effects), 0),
        }
    }

    // Random event sequences never get stuck: cancel or expiry always returns to Idle
    #[test]
    fn prop_sessions_always_end(
        events in proptest::collection::vec(arb_event(), 0..20),
        dir in arb_directory(),
        chat in arb_chat(),
    ) {
        let ctx = ConvContext::new(&chat, &dir);
        let mut state = ConvState::Idle;

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
            }
        }

        if state.is_active() {
            let result = transition(&state, &ctx, Event::SessionExpired).unwrap();
            prop_assert_eq!(result.new_state, ConvState::Idle);
        }
    }
}
