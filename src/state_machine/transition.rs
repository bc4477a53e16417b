//! Pure state transition function
//!
//! Given the same state, context and event, `transition` always produces
//! the same next state and effects. It performs no I/O.

use super::state::ANSWER_TEMPERATURE;
use super::{Effect, Event, FailureKind, TurnContext, TurnOutcome, TurnState};
use crate::db::Message;
use crate::prompt::{assemble_prompt, history_window};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::new(TurnState::Failed {
            kind,
            message: message.into(),
        })
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Turn already finished in state {0}")]
    Terminal(&'static str),
    #[error("Invalid transition: {event} in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Entry point of every turn
pub fn start(context: &TurnContext) -> TransitionResult {
    TransitionResult::new(TurnState::ResolvingSession).with_effect(Effect::ResolveSession {
        conversation_id: context.conversation_id,
    })
}

/// Pure transition function
pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if state.is_terminal() {
        return Err(TransitionError::Terminal(state.name()));
    }

    match (state, event) {
        // ============================================================
        // Session resolution
        // ============================================================

        // New conversation -> name it first
        (TurnState::ResolvingSession, Event::SessionResolved { conversation })
            if context.is_new_conversation() =>
        {
            let effect = Effect::NameSession {
                conversation_id: conversation.id,
                question: context.question.clone(),
            };
            Ok(TransitionResult::new(TurnState::NamingSession { conversation }).with_effect(effect))
        }

        // Existing conversation -> record the question
        (TurnState::ResolvingSession, Event::SessionResolved { conversation }) => {
            Ok(persist_question(conversation, context))
        }

        (TurnState::ResolvingSession, Event::SessionMissing { conversation_id }) => {
            Ok(TransitionResult::failed(
                FailureKind::SessionNotFound,
                format!("Conversation not found: {conversation_id}"),
            ))
        }

        // ============================================================
        // Naming (new conversations only)
        // ============================================================
        (TurnState::NamingSession { .. }, Event::SessionNamed { conversation }) => {
            Ok(persist_question(conversation, context))
        }

        // The conversation stays, unnamed
        (
            TurnState::NamingSession { conversation },
            Event::NamingError { message } | Event::StoreError { message },
        ) => Ok(TransitionResult::failed(
            FailureKind::NamingFailed,
            format!("Failed to name conversation {}: {message}", conversation.id),
        )),

        // ============================================================
        // Prompt building
        // ============================================================
        (TurnState::PersistingUserTurn { conversation }, Event::UserTurnPersisted { turn }) => {
            let effect = Effect::LoadHistory {
                conversation_id: conversation.id,
            };
            Ok(TransitionResult::new(TurnState::BuildingPrompt {
                conversation: conversation.clone(),
                user_turn_id: turn.id,
            })
            .with_effect(effect))
        }

        (
            TurnState::BuildingPrompt {
                conversation,
                user_turn_id,
            },
            Event::HistoryLoaded { turns },
        ) => {
            let prior = turns_before(&turns, *user_turn_id);
            let request = assemble_prompt(&context.system_prompt, history_window(prior), &context.question)
                .with_temperature(ANSWER_TEMPERATURE);
            Ok(TransitionResult::new(TurnState::AwaitingCompletion {
                conversation: conversation.clone(),
            })
            .with_effect(Effect::RequestCompletion { request }))
        }

        // ============================================================
        // Completion
        // ============================================================
        (TurnState::AwaitingCompletion { conversation }, Event::CompletionReceived { answer }) => {
            let effect = Effect::persist_assistant_turn(conversation.id, answer);
            Ok(TransitionResult::new(TurnState::PersistingAssistantTurn {
                conversation: conversation.clone(),
            })
            .with_effect(effect))
        }

        // The user's message is already stored; only the answer is lost
        (TurnState::AwaitingCompletion { .. }, Event::CompletionError { message }) => {
            Ok(TransitionResult::failed(FailureKind::CompletionFailed, message))
        }

        // The reply reported back is the one the store accepted
        (TurnState::PersistingAssistantTurn { conversation }, Event::AssistantTurnPersisted { turn }) => {
            Ok(TransitionResult::new(TurnState::Done(TurnOutcome {
                conversation_id: conversation.id,
                conversation_name: conversation.name.clone(),
                question: context.question.clone(),
                answer: turn.content,
            })))
        }

        // ============================================================
        // Store failures anywhere else
        // ============================================================
        (_, Event::StoreError { message }) => {
            Ok(TransitionResult::failed(FailureKind::PersistenceFailed, message))
        }

        (state, event) => Err(TransitionError::InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

fn persist_question(conversation: crate::db::Conversation, context: &TurnContext) -> TransitionResult {
    let effect = Effect::persist_user_turn(conversation.id, context.question.clone());
    TransitionResult::new(TurnState::PersistingUserTurn { conversation }).with_effect(effect)
}

/// Messages stored before the question of this turn.
///
/// The question itself is dropped here because the prompt appends it as the
/// final user message. Turns appended concurrently after it are dropped too.
/// If the question is not in `turns` the whole slice counts as history.
fn turns_before(turns: &[Message], user_turn_id: i64) -> &[Message] {
    match turns.iter().position(|t| t.id == user_turn_id) {
        Some(idx) => &turns[..idx],
        None => turns,
    }
}
