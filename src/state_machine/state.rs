//! Turn state types

use crate::db::Conversation;
use crate::system_prompt::SystemPrompt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling temperature for answers
pub const ANSWER_TEMPERATURE: f32 = 0.8;

/// Immutable inputs of one turn
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// `None` asks for a new conversation
    pub conversation_id: Option<i64>,
    pub question: String,
    pub system_prompt: SystemPrompt,
}

impl TurnContext {
    /// A conversation id of `0` means "start a new conversation".
    pub fn new(conversation_id: Option<i64>, question: impl Into<String>, system_prompt: SystemPrompt) -> Self {
        Self {
            conversation_id: conversation_id.filter(|id| *id != 0),
            question: question.into(),
            system_prompt,
        }
    }

    pub fn is_new_conversation(&self) -> bool {
        self.conversation_id.is_none()
    }
}

/// State of a single chat turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnState {
    /// Looking up or creating the conversation
    ResolvingSession,
    /// New conversations only: asking the model for a name
    NamingSession { conversation: Conversation },
    /// Recording the user's question
    PersistingUserTurn { conversation: Conversation },
    /// Loading history to assemble the prompt
    BuildingPrompt {
        conversation: Conversation,
        user_turn_id: i64,
    },
    /// Waiting on the completion model
    AwaitingCompletion { conversation: Conversation },
    /// Recording the model's answer
    PersistingAssistantTurn { conversation: Conversation },
    Done(TurnOutcome),
    Failed { kind: FailureKind, message: String },
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Done(_) | TurnState::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TurnState::ResolvingSession => "resolving_session",
            TurnState::NamingSession { .. } => "naming_session",
            TurnState::PersistingUserTurn { .. } => "persisting_user_turn",
            TurnState::BuildingPrompt { .. } => "building_prompt",
            TurnState::AwaitingCompletion { .. } => "awaiting_completion",
            TurnState::PersistingAssistantTurn { .. } => "persisting_assistant_turn",
            TurnState::Done(_) => "done",
            TurnState::Failed { .. } => "failed",
        }
    }
}

/// Result of a completed turn, returned to the caller as-is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub conversation_id: i64,
    pub conversation_name: String,
    pub question: String,
    pub answer: String,
}

/// Why a turn failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    BadRequest,
    SessionNotFound,
    NamingFailed,
    CompletionFailed,
    PersistenceFailed,
    /// The state machine received an event it has no rule for
    InvariantViolation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::BadRequest => "bad request",
            FailureKind::SessionNotFound => "conversation not found",
            FailureKind::NamingFailed => "failed to name conversation",
            FailureKind::CompletionFailed => "failed to get completion",
            FailureKind::PersistenceFailed => "failed to persist",
            FailureKind::InvariantViolation => "invariant violation",
        };
        f.write_str(s)
    }
}
