//! Effects produced by state transitions

use crate::db::Role;
use crate::llm::LlmRequest;

/// I/O the executor performs after a transition. Each effect yields
/// exactly one [`Event`](super::Event).
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch the conversation, or create one when `conversation_id` is `None`
    ResolveSession { conversation_id: Option<i64> },

    /// Generate a name from the question and store it
    NameSession {
        conversation_id: i64,
        question: String,
    },

    /// Append a message to the conversation
    PersistTurn {
        conversation_id: i64,
        role: Role,
        content: String,
    },

    /// Load all messages of the conversation
    LoadHistory { conversation_id: i64 },

    /// Call the completion model
    RequestCompletion { request: LlmRequest },
}

impl Effect {
    pub fn persist_user_turn(conversation_id: i64, content: impl Into<String>) -> Self {
        Effect::PersistTurn {
            conversation_id,
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn persist_assistant_turn(conversation_id: i64, content: impl Into<String>) -> Self {
        Effect::PersistTurn {
            conversation_id,
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
