//! Events fed back into the turn state machine

use crate::db::{Conversation, Message};

/// Outcomes of executed effects
#[derive(Debug, Clone)]
pub enum Event {
    // Session events
    SessionResolved { conversation: Conversation },
    SessionMissing { conversation_id: i64 },
    SessionNamed { conversation: Conversation },
    NamingError { message: String },

    // Persistence events
    UserTurnPersisted { turn: Message },
    HistoryLoaded { turns: Vec<Message> },
    AssistantTurnPersisted { turn: Message },
    StoreError { message: String },

    // Completion events
    CompletionReceived { answer: String },
    CompletionError { message: String },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionResolved { .. } => "session_resolved",
            Event::SessionMissing { .. } => "session_missing",
            Event::SessionNamed { .. } => "session_named",
            Event::NamingError { .. } => "naming_error",
            Event::UserTurnPersisted { .. } => "user_turn_persisted",
            Event::HistoryLoaded { .. } => "history_loaded",
            Event::AssistantTurnPersisted { .. } => "assistant_turn_persisted",
            Event::StoreError { .. } => "store_error",
            Event::CompletionReceived { .. } => "completion_received",
            Event::CompletionError { .. } => "completion_error",
        }
    }
}
