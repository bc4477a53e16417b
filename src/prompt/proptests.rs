//! Property-based tests for history windowing and prompt assembly

use super::*;
use crate::db::Role;
use crate::llm::MessageRole;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant)]
}

fn arb_history() -> impl Strategy<Value = Vec<Message>> {
    proptest::collection::vec((arb_role(), "[a-zA-Z0-9 ?!.]{0,40}"), 0..30).prop_map(|items| {
        items
            .into_iter()
            .zip(1i64..)
            .map(|((role, content), i)| Message {
                id: i,
                conversation_id: 1,
                sequence_id: i,
                role,
                content,
                created_at: Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap(),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn window_is_bounded_suffix(history in arb_history()) {
        let window = history_window(&history);
        prop_assert_eq!(window.len(), history.len().min(HISTORY_WINDOW));
        prop_assert!(history.ends_with(window));
    }

    #[test]
    fn window_of_any_limit(history in arb_history(), limit in 0usize..40) {
        let window = window_of(&history, limit);
        prop_assert_eq!(window.len(), history.len().min(limit));
        prop_assert!(history.ends_with(window));
    }

    #[test]
    fn assembled_prompt_shape(history in arb_history(), question in "[a-zA-Z ?]{1,40}") {
        let system = SystemPrompt::new("fixed instruction");
        let window = history_window(&history);
        let request = assemble_prompt(&system, window, &question);
        let messages = &request.messages;

        prop_assert_eq!(messages.len(), window.len() + 2);
        prop_assert!(messages.len() <= HISTORY_WINDOW + 2);

        // Exactly one system message, and it comes first
        prop_assert_eq!(messages[0].role, MessageRole::System);
        prop_assert_eq!(messages[0].content.as_str(), "fixed instruction");
        prop_assert_eq!(
            messages.iter().filter(|m| m.role == MessageRole::System).count(),
            1
        );

        // History preserved turn by turn
        for (msg, turn) in messages[1..messages.len() - 1].iter().zip(window) {
            prop_assert_eq!(msg.role, MessageRole::from(turn.role));
            prop_assert_eq!(&msg.content, &turn.content);
        }

        let last = messages.last().unwrap();
        prop_assert_eq!(last.role, MessageRole::User);
        prop_assert_eq!(&last.content, &question);
    }
}
