//! Chat turn executor

use super::traits::SessionStore;

use crate::db::{DbError, Role};
use crate::llm::LlmService;
use crate::state_machine::{
    start, transition, Effect, Event, FailureKind, TurnContext, TurnOutcome, TurnState,
};
use crate::system_prompt::SystemPrompt;
use crate::title_generator::generate_name;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A turn that ended in `Failed`
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TurnError {
    pub kind: FailureKind,
    pub message: String,
}

impl TurnError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Drives one chat turn through the state machine, performing the effects
/// it asks for against the store and the completion model.
pub struct TurnOrchestrator<S: SessionStore> {
    store: S,
    llm: Arc<dyn LlmService>,
    system_prompt: SystemPrompt,
    completion_timeout: Duration,
}

impl<S: SessionStore> TurnOrchestrator<S> {
    pub fn new(
        store: S,
        llm: Arc<dyn LlmService>,
        system_prompt: SystemPrompt,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            store,
            llm,
            system_prompt,
            completion_timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Run a full turn: resolve (and name) the conversation, record the
    /// question, ask the model, record the answer.
    pub async fn run_turn(
        &self,
        conversation_id: Option<i64>,
        question: String,
    ) -> Result<TurnOutcome, TurnError> {
        if question.trim().is_empty() {
            return Err(TurnError::new(FailureKind::BadRequest, "Question must not be empty"));
        }

        let context = TurnContext::new(conversation_id, question, self.system_prompt.clone());
        let initial = start(&context);
        let mut state = initial.new_state;
        let mut pending: VecDeque<Effect> = initial.effects.into();

        // Process effects in a loop - no recursion
        while let Some(effect) = pending.pop_front() {
            let event = self.execute_effect(effect).await;
            let event_name = event.name();

            let result = transition(&state, &context, event)
                .map_err(|e| TurnError::new(FailureKind::InvariantViolation, e.to_string()))?;

            tracing::debug!(
                from = state.name(),
                to = result.new_state.name(),
                event = event_name,
                "Turn transition"
            );

            state = result.new_state;
            pending.extend(result.effects);
        }

        match state {
            TurnState::Done(outcome) => {
                tracing::info!(
                    conv_id = outcome.conversation_id,
                    new_conversation = context.is_new_conversation(),
                    answer_len = outcome.answer.len(),
                    "Turn completed"
                );
                Ok(outcome)
            }
            TurnState::Failed { kind, message } => {
                tracing::warn!(
                    conv_id = ?context.conversation_id,
                    kind = ?kind,
                    error = %message,
                    "Turn failed"
                );
                Err(TurnError::new(kind, message))
            }
            other => Err(TurnError::new(
                FailureKind::InvariantViolation,
                format!("Turn stalled in state {}", other.name()),
            )),
        }
    }

    /// Execute an effect and return the event it produced
    async fn execute_effect(&self, effect: Effect) -> Event {
        match effect {
            Effect::ResolveSession { conversation_id } => {
                match self.store.resolve(conversation_id).await {
                    Ok(conversation) => {
                        tracing::debug!(
                            conv_id = conversation.id,
                            named = conversation.is_named(),
                            "Resolved conversation"
                        );
                        Event::SessionResolved { conversation }
                    }
                    Err(DbError::ConversationNotFound(id)) => {
                        Event::SessionMissing { conversation_id: id }
                    }
                    Err(e) => Event::StoreError {
                        message: e.to_string(),
                    },
                }
            }

            Effect::NameSession {
                conversation_id,
                question,
            } => {
                let name =
                    match generate_name(&question, self.llm.as_ref(), self.completion_timeout).await {
                        Ok(name) => name,
                        Err(e) => {
                            return Event::NamingError {
                                message: e.to_string(),
                            }
                        }
                    };

                match self.store.rename(conversation_id, &name).await {
                    Ok(conversation) => {
                        tracing::info!(conv_id = conversation_id, name = %name, "Named conversation");
                        Event::SessionNamed { conversation }
                    }
                    Err(e) => Event::StoreError {
                        message: e.to_string(),
                    },
                }
            }

            Effect::PersistTurn {
                conversation_id,
                role,
                content,
            } => match self.store.append_turn(conversation_id, role, &content).await {
                Ok(turn) => match role {
                    Role::User => Event::UserTurnPersisted { turn },
                    Role::Assistant => Event::AssistantTurnPersisted { turn },
                },
                Err(e) => Event::StoreError {
                    message: e.to_string(),
                },
            },

            Effect::LoadHistory { conversation_id } => {
                match self.store.list_turns(conversation_id).await {
                    Ok(turns) => Event::HistoryLoaded { turns },
                    Err(e) => Event::StoreError {
                        message: e.to_string(),
                    },
                }
            }

            Effect::RequestCompletion { request } => {
                let limit = self.completion_timeout;
                match tokio::time::timeout(limit, self.llm.complete(&request)).await {
                    Ok(Ok(response)) => Event::CompletionReceived {
                        answer: response.text,
                    },
                    Ok(Err(e)) => Event::CompletionError {
                        message: e.to_string(),
                    },
                    Err(_) => Event::CompletionError {
                        message: format!("Completion timed out after {limit:?}"),
                    },
                }
            }
        }
    }
}
