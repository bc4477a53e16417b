//! Property-based tests for the turn state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::ANSWER_TEMPERATURE;
use super::transition::TransitionError;
use super::*;
use crate::db::{Conversation, Message, Role};
use crate::llm::MessageRole;
use crate::prompt::HISTORY_WINDOW;
use crate::system_prompt::SystemPrompt;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn conversation(id: i64) -> Conversation {
    Conversation {
        id,
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        name: String::new(),
    }
}

fn message(id: i64, role: Role, content: String) -> Message {
    Message {
        id,
        conversation_id: 1,
        sequence_id: id,
        role,
        content,
        created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_context() -> impl Strategy<Value = TurnContext> {
    (proptest::option::of(0i64..100), "[a-zA-Z ?]{1,40}").prop_map(|(id, question)| {
        TurnContext::new(id, question, SystemPrompt::new("fixed instruction"))
    })
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::User), Just(Role::Assistant)]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (1i64..1000, arb_role(), "[a-z ]{0,20}").prop_map(|(id, role, content)| message(id, role, content))
}

fn arb_failure_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::BadRequest),
        Just(FailureKind::SessionNotFound),
        Just(FailureKind::NamingFailed),
        Just(FailureKind::CompletionFailed),
        Just(FailureKind::PersistenceFailed),
        Just(FailureKind::InvariantViolation),
    ]
}

fn arb_terminal_state() -> impl Strategy<Value = TurnState> {
    prop_oneof![
        ("[a-z]{1,10}", "[a-z]{1,10}").prop_map(|(question, answer)| {
            TurnState::Done(TurnOutcome {
                conversation_id: 1,
                conversation_name: "chat".to_string(),
                question,
                answer,
            })
        }),
        (arb_failure_kind(), "[a-z ]{0,20}").prop_map(|(kind, message)| TurnState::Failed { kind, message }),
    ]
}

fn arb_active_state() -> impl Strategy<Value = TurnState> {
    (1i64..100).prop_flat_map(|id| {
        prop_oneof![
            Just(TurnState::ResolvingSession),
            Just(TurnState::NamingSession {
                conversation: conversation(id)
            }),
            Just(TurnState::PersistingUserTurn {
                conversation: conversation(id)
            }),
            Just(TurnState::BuildingPrompt {
                conversation: conversation(id),
                user_turn_id: id
            }),
            Just(TurnState::AwaitingCompletion {
                conversation: conversation(id)
            }),
            Just(TurnState::PersistingAssistantTurn {
                conversation: conversation(id)
            }),
        ]
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (1i64..100).prop_map(|id| Event::SessionResolved {
            conversation: conversation(id)
        }),
        (1i64..100).prop_map(|conversation_id| Event::SessionMissing { conversation_id }),
        (1i64..100).prop_map(|id| Event::SessionNamed {
            conversation: conversation(id)
        }),
        "[a-z ]{1,20}".prop_map(|message| Event::NamingError { message }),
        arb_message().prop_map(|turn| Event::UserTurnPersisted { turn }),
        proptest::collection::vec(arb_message(), 0..20).prop_map(|turns| Event::HistoryLoaded { turns }),
        arb_message().prop_map(|turn| Event::AssistantTurnPersisted { turn }),
        "[a-z ]{1,20}".prop_map(|message| Event::StoreError { message }),
        "[a-z ]{1,20}".prop_map(|answer| Event::CompletionReceived { answer }),
        "[a-z ]{1,20}".prop_map(|message| Event::CompletionError { message }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Terminal states never move again
    #[test]
    fn prop_terminal_states_reject_all_events(
        state in arb_terminal_state(),
        ctx in arb_context(),
        event in arb_event(),
    ) {
        let result = transition(&state, &ctx, event);
        prop_assert!(matches!(result, Err(TransitionError::Terminal(_))));
    }

    // Every transition emits at most one effect, and a terminal result emits none
    #[test]
    fn prop_effects_are_bounded(
        state in arb_active_state(),
        ctx in arb_context(),
        event in arb_event(),
    ) {
        if let Ok(result) = transition(&state, &ctx, event) {
            prop_assert!(result.effects.len() <= 1);
            if result.new_state.is_terminal() {
                prop_assert!(result.effects.is_empty());
            }
        }
    }

    // A store failure always ends the turn
    #[test]
    fn prop_store_error_always_fails(
        state in arb_active_state(),
        ctx in arb_context(),
        message in "[a-z ]{1,20}",
    ) {
        let result = transition(&state, &ctx, Event::StoreError { message }).unwrap();
        match result.new_state {
            TurnState::Failed { kind, .. } => {
                let expected = if matches!(state, TurnState::NamingSession { .. }) {
                    FailureKind::NamingFailed
                } else {
                    FailureKind::PersistenceFailed
                };
                prop_assert_eq!(kind, expected);
            }
            other => prop_assert!(false, "Expected Failed, got {:?}", other),
        }
        prop_assert!(result.effects.is_empty());
    }

    // Naming happens exactly when no usable conversation id was given
    #[test]
    fn prop_naming_only_for_new_sessions(ctx in arb_context(), id in 1i64..100) {
        let result = transition(
            &TurnState::ResolvingSession,
            &ctx,
            Event::SessionResolved { conversation: conversation(id) },
        ).unwrap();

        let naming = matches!(result.new_state, TurnState::NamingSession { .. });
        prop_assert_eq!(naming, ctx.is_new_conversation());
    }

    // The completion request is bounded and ends with the question
    #[test]
    fn prop_completion_request_shape(
        ctx in arb_context(),
        roles in proptest::collection::vec(arb_role(), 0..30),
    ) {
        let mut turns: Vec<Message> = roles
            .into_iter()
            .zip(1i64..)
            .map(|(role, i)| message(i, role, format!("turn {i}")))
            .collect();
        let user_turn_id = i64::try_from(turns.len()).unwrap() + 1;
        turns.push(message(user_turn_id, Role::User, ctx.question.clone()));
        let prior = turns.len() - 1;

        let result = transition(
            &TurnState::BuildingPrompt { conversation: conversation(1), user_turn_id },
            &ctx,
            Event::HistoryLoaded { turns },
        ).unwrap();

        let Some(Effect::RequestCompletion { request }) = result.effects.first() else {
            return Err(TestCaseError::fail("expected RequestCompletion"));
        };
        let messages = &request.messages;
        prop_assert_eq!(messages.len(), prior.min(HISTORY_WINDOW) + 2);
        prop_assert_eq!(messages[0].role, MessageRole::System);
        prop_assert_eq!(
            messages.iter().filter(|m| m.content == ctx.question && m.role == MessageRole::User).count(),
            1
        );
        let last = messages.last().unwrap();
        prop_assert_eq!(last.role, MessageRole::User);
        prop_assert_eq!(&last.content, &ctx.question);
        prop_assert_eq!(request.temperature, Some(ANSWER_TEMPERATURE));
    }

    // Walking the happy path always ends in Done with the given answer
    #[test]
    fn prop_happy_path_reaches_done(ctx in arb_context(), answer in "[a-zA-Z ]{1,30}") {
        let conv = conversation(ctx.conversation_id.unwrap_or(1));
        let mut state = start(&ctx).new_state;
        let mut events = vec![Event::SessionResolved { conversation: conv.clone() }];
        if ctx.is_new_conversation() {
            events.push(Event::SessionNamed { conversation: conv.clone() });
        }
        events.push(Event::UserTurnPersisted { turn: message(1, Role::User, ctx.question.clone()) });
        events.push(Event::HistoryLoaded { turns: vec![message(1, Role::User, ctx.question.clone())] });
        events.push(Event::CompletionReceived { answer: answer.clone() });
        events.push(Event::AssistantTurnPersisted { turn: message(2, Role::Assistant, answer.clone()) });

        for event in events {
            state = transition(&state, &ctx, event).unwrap().new_state;
        }

        match state {
            TurnState::Done(outcome) => {
                prop_assert_eq!(outcome.answer, answer);
                prop_assert_eq!(outcome.question, ctx.question.clone());
                prop_assert_eq!(outcome.conversation_id, conv.id);
            }
            other => prop_assert!(false, "Expected Done, got {:?}", other),
        }
    }
}
